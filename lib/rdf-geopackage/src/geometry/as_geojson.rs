use super::{FeatureTableContext, GeometryNodes, GeometrySerialization};
use crate::error::GeometryError;
use geo::Geometry;
use rdf_geopackage_model::vocab::{geo as geosparql, rdf};
use rdf_geopackage_model::{Literal, Quad};
use serde_json::Value;

/// Serializes the geometry as a `geo:geoJSONLiteral`.
///
/// GeoJSON coordinates are always in WGS84, so geometries of other systems are reprojected. A
/// reprojected geometry is a different geometry than the one in the table, which is why it gets
/// a geometry node of its own in that case.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonSerialization;

impl GeometrySerialization for GeoJsonSerialization {
    fn id(&self) -> &'static str {
        "geojson"
    }

    fn requires_separate_geometry_subject(&self, table: &FeatureTableContext) -> bool {
        !table.srs.is_wgs84()
    }

    fn requires_wgs84(&self) -> bool {
        true
    }

    fn quads(
        &self,
        geometry: &Geometry<f64>,
        nodes: &GeometryNodes<'_>,
        table: &FeatureTableContext,
        quads: &mut Vec<Quad>,
    ) -> Result<(), GeometryError> {
        let literal = geojson_literal(&*table.to_wgs84(geometry)?)?;
        quads.push(nodes.quad(
            nodes.feature,
            geosparql::HAS_DEFAULT_GEOMETRY,
            nodes.geometry.clone(),
        ));
        quads.push(nodes.quad(nodes.geometry, rdf::TYPE, geosparql::GEOMETRY));
        quads.push(nodes.quad(nodes.geometry, geosparql::AS_GEO_JSON, literal));
        Ok(())
    }
}

/// Builds a `geo:geoJSONLiteral` with the keys of every object in lexicographic order, so equal
/// geometries always give equal literals.
pub fn geojson_literal(geometry: &Geometry<f64>) -> Result<Literal, GeometryError> {
    let value = geojson::Geometry::new(geojson::Value::from(geometry));
    let json = serde_json::to_value(&value)
        .map_err(|error| GeometryError::Encoding(error.to_string()))?;
    Ok(Literal::new_typed_literal(
        sort_keys(json).to_string(),
        geosparql::GEO_JSON_LITERAL,
    ))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.into_iter().collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sort_keys).collect()),
        value => value,
    }
}
