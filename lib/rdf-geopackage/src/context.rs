use crate::error::GenerationError;
use crate::geometry::GeometrySerialization;
use crate::models::TabularModel;
use crate::registry::{Namespace, StrategyRegistry};
use rdf_geopackage_common::BlankNodeMode;
use rdf_geopackage_model::vocab::xyz;
use rdf_geopackage_model::{BoundingBox, Iri};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// The options of a single conversion, as given by a user.
///
/// Strategies are referenced by id. [ConversionOptions::into_context] resolves them against a
/// [StrategyRegistry] and validates the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionOptions {
    /// The IRI that table and row IRIs are resolved against. Defaults to the Facade-X data
    /// namespace.
    pub base_iri: Option<String>,
    /// If set, only these tables are converted.
    pub allowed_layers: Option<Vec<String>>,
    /// If set, only features intersecting this WGS84 box are converted.
    pub bounding_box: Option<BoundingBox>,
    /// Whether binary values are converted to `xsd:base64Binary` literals.
    pub include_binary_values: bool,
    /// The id of the generic model. Defaults to the first registered one.
    pub model: Option<String>,
    /// The ids of the geometry strategies. Defaults to the first registered one.
    pub geometry_models: Vec<String>,
    pub blank_node_mode: BlankNodeMode,
}

impl ConversionOptions {
    /// Validates the options and resolves the strategies.
    pub fn into_context(
        self,
        registry: &StrategyRegistry,
    ) -> Result<GenerationContext, GenerationError> {
        let base_iri = self
            .base_iri
            .unwrap_or_else(|| xyz::NAMESPACE.to_owned());
        let base_iri = Iri::parse(base_iri.clone())
            .map_err(|error| GenerationError::InvalidBaseIri {
                iri: base_iri,
                error,
            })?;

        let model_id = self
            .model
            .as_deref()
            .or_else(|| registry.default_id(Namespace::Generic))
            .unwrap_or_default();
        let model = registry.resolve_generic(model_id)?;

        let geometry_ids = if self.geometry_models.is_empty() {
            registry
                .default_id(Namespace::Geometry)
                .map(|id| vec![id.to_owned()])
                .unwrap_or_default()
        } else {
            self.geometry_models
        };
        let mut seen = HashSet::new();
        let geometry_models = geometry_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .map(|id| registry.resolve_geometry(id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GenerationContext {
            base_iri,
            allowed_layers: self
                .allowed_layers
                .map(|layers| layers.into_iter().collect()),
            bounding_box: self.bounding_box,
            include_binary_values: self.include_binary_values,
            model,
            geometry_models,
            blank_node_mode: self.blank_node_mode,
        })
    }
}

/// The immutable context of a conversion run.
#[derive(Clone)]
pub struct GenerationContext {
    base_iri: Iri<String>,
    allowed_layers: Option<HashSet<String>>,
    bounding_box: Option<BoundingBox>,
    include_binary_values: bool,
    model: Arc<dyn TabularModel>,
    geometry_models: Vec<Arc<dyn GeometrySerialization>>,
    blank_node_mode: BlankNodeMode,
}

impl GenerationContext {
    pub fn base_iri(&self) -> &Iri<String> {
        &self.base_iri
    }

    /// Whether the table called `name` passes the layer allow-list.
    pub fn allows_layer(&self, name: &str) -> bool {
        self.allowed_layers
            .as_ref()
            .map_or(true, |layers| layers.contains(name))
    }

    /// The WGS84 filter box, if any.
    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.bounding_box.as_ref()
    }

    pub fn include_binary_values(&self) -> bool {
        self.include_binary_values
    }

    pub fn model(&self) -> &Arc<dyn TabularModel> {
        &self.model
    }

    /// The active geometry strategies in selection order.
    pub fn geometry_models(&self) -> &[Arc<dyn GeometrySerialization>] {
        &self.geometry_models
    }

    pub fn blank_node_mode(&self) -> BlankNodeMode {
        self.blank_node_mode
    }

    /// Whether the table CRSs have to be resolved before the run, i.e., whether a bounding box
    /// must be reprojected or a strategy reprojects geometries.
    pub fn needs_projections(&self) -> bool {
        self.bounding_box.is_some()
            || self
                .geometry_models
                .iter()
                .any(|strategy| strategy.requires_wgs84())
    }
}

impl fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationContext")
            .field("base_iri", &self.base_iri.as_str())
            .field("allowed_layers", &self.allowed_layers)
            .field("bounding_box", &self.bounding_box)
            .field("include_binary_values", &self.include_binary_values)
            .field("model", &self.model.id())
            .field(
                "geometry_models",
                &self
                    .geometry_models
                    .iter()
                    .map(|strategy| strategy.id())
                    .collect::<Vec<_>>(),
            )
            .field("blank_node_mode", &self.blank_node_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let context = ConversionOptions::default()
            .into_context(&StrategyRegistry::with_defaults())
            .unwrap();
        assert_eq!(context.base_iri().as_str(), "http://sparql.xyz/facade-x/data/");
        assert_eq!(context.model().id(), "facade-x");
        assert_eq!(context.geometry_models().len(), 1);
        assert_eq!(context.geometry_models()[0].id(), "wkt");
        assert!(context.allows_layer("anything"));
        assert!(!context.needs_projections());
    }

    #[test]
    fn duplicate_geometry_models_are_applied_once() {
        let context = ConversionOptions {
            geometry_models: vec!["geojson".into(), "wkt".into(), "geojson".into()],
            ..ConversionOptions::default()
        }
        .into_context(&StrategyRegistry::with_defaults())
        .unwrap();
        let ids = context
            .geometry_models()
            .iter()
            .map(|strategy| strategy.id())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["geojson", "wkt"]);
        assert!(context.needs_projections());
    }

    #[test]
    fn layer_allow_list() {
        let context = ConversionOptions {
            allowed_layers: Some(vec!["roads".into()]),
            ..ConversionOptions::default()
        }
        .into_context(&StrategyRegistry::with_defaults())
        .unwrap();
        assert!(context.allows_layer("roads"));
        assert!(!context.allows_layer("rivers"));
    }

    #[test]
    fn bounding_box_needs_projections() {
        let context = ConversionOptions {
            bounding_box: Some(BoundingBox::parse("4,50,6,53").unwrap()),
            ..ConversionOptions::default()
        }
        .into_context(&StrategyRegistry::with_defaults())
        .unwrap();
        assert!(context.needs_projections());
    }

    #[test]
    fn unknown_model_fails() {
        let error = ConversionOptions {
            model: Some("json-ld".into()),
            ..ConversionOptions::default()
        }
        .into_context(&StrategyRegistry::with_defaults())
        .unwrap_err();
        assert!(matches!(error, GenerationError::Lookup(_)));
    }

    #[test]
    fn relative_base_iri_fails() {
        let error = ConversionOptions {
            base_iri: Some("data/".into()),
            ..ConversionOptions::default()
        }
        .into_context(&StrategyRegistry::with_defaults())
        .unwrap_err();
        assert!(matches!(error, GenerationError::InvalidBaseIri { .. }));
    }
}
