use crate::error::LookupError;
use crate::geometry::{
    BoundingBoxGeometry, CentroidGeometry, FeatureMetrics, GeoJsonSerialization,
    GeometrySerialization, WktSerialization,
};
use crate::models::{FacadeX, RowSubjects, TabularModel};
use std::fmt;
use std::sync::Arc;

/// The two kinds of strategies a [StrategyRegistry] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Row-to-quads models. Exactly one is active per run.
    Generic,
    /// Geometry-to-quads strategies. Several may be active per run.
    Geometry,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Namespace::Generic => "generic",
            Namespace::Geometry => "geometry",
        })
    }
}

/// Named, swappable quad-generation strategies.
///
/// The registry is built once and then shared read-only. Registration order matters: the first
/// strategy of a namespace is its default.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    generic: Vec<(&'static str, Arc<dyn TabularModel>)>,
    geometry: Vec<(&'static str, Arc<dyn GeometrySerialization>)>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with all built-in strategies.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_generic(Arc::new(FacadeX::new(RowSubjects::BlankNodes)));
        registry.register_generic(Arc::new(FacadeX::new(RowSubjects::Iris)));
        registry.register_geometry(Arc::new(WktSerialization));
        registry.register_geometry(Arc::new(GeoJsonSerialization));
        registry.register_geometry(Arc::new(BoundingBoxGeometry));
        registry.register_geometry(Arc::new(CentroidGeometry));
        registry.register_geometry(Arc::new(FeatureMetrics));
        registry
    }

    /// Registers a generic model under its id. A model with the same id is replaced in place.
    pub fn register_generic(&mut self, model: Arc<dyn TabularModel>) {
        register(&mut self.generic, model.id(), model);
    }

    /// Registers a geometry strategy under its id. A strategy with the same id is replaced in
    /// place.
    pub fn register_geometry(&mut self, strategy: Arc<dyn GeometrySerialization>) {
        register(&mut self.geometry, strategy.id(), strategy);
    }

    pub fn resolve_generic(&self, id: &str) -> Result<Arc<dyn TabularModel>, LookupError> {
        resolve(&self.generic, Namespace::Generic, id)
    }

    pub fn resolve_geometry(
        &self,
        id: &str,
    ) -> Result<Arc<dyn GeometrySerialization>, LookupError> {
        resolve(&self.geometry, Namespace::Geometry, id)
    }

    /// Returns the ids of a namespace in registration order.
    pub fn list_ids(&self, namespace: Namespace) -> Vec<&'static str> {
        match namespace {
            Namespace::Generic => self.generic.iter().map(|(id, _)| *id).collect(),
            Namespace::Geometry => self.geometry.iter().map(|(id, _)| *id).collect(),
        }
    }

    /// Returns the first registered id of a namespace.
    pub fn default_id(&self, namespace: Namespace) -> Option<&'static str> {
        match namespace {
            Namespace::Generic => self.generic.first().map(|(id, _)| *id),
            Namespace::Geometry => self.geometry.first().map(|(id, _)| *id),
        }
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("generic", &self.list_ids(Namespace::Generic))
            .field("geometry", &self.list_ids(Namespace::Geometry))
            .finish()
    }
}

fn register<T: ?Sized>(entries: &mut Vec<(&'static str, Arc<T>)>, id: &'static str, entry: Arc<T>) {
    match entries.iter_mut().find(|(existing, _)| *existing == id) {
        Some(slot) => slot.1 = entry,
        None => entries.push((id, entry)),
    }
}

fn resolve<T: ?Sized>(
    entries: &[(&'static str, Arc<T>)],
    namespace: Namespace,
    id: &str,
) -> Result<Arc<T>, LookupError> {
    entries
        .iter()
        .find(|(existing, _)| *existing == id)
        .map(|(_, entry)| Arc::clone(entry))
        .ok_or_else(|| LookupError {
            namespace,
            id: id.to_owned(),
            known: entries.iter().map(|(id, _)| (*id).to_owned()).collect(),
        })
}
