use super::{
    geometry_type_name, wkt_literal, FeatureTableContext, GeometryNodes, GeometrySerialization,
};
use crate::error::GeometryError;
use geo::{BoundingRect, Geometry};
use rdf_geopackage_model::vocab::{geo as geosparql, rdf, sf};
use rdf_geopackage_model::Quad;

/// Describes the minimum bounding rectangle of the geometry as an `sf:Envelope`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingBoxGeometry;

impl GeometrySerialization for BoundingBoxGeometry {
    fn id(&self) -> &'static str {
        "bbox"
    }

    fn requires_separate_geometry_subject(&self, _table: &FeatureTableContext) -> bool {
        true
    }

    fn quads(
        &self,
        geometry: &Geometry<f64>,
        nodes: &GeometryNodes<'_>,
        table: &FeatureTableContext,
        quads: &mut Vec<Quad>,
    ) -> Result<(), GeometryError> {
        let envelope = geometry
            .bounding_rect()
            .ok_or(GeometryError::Empty(geometry_type_name(geometry)))?;
        quads.push(nodes.quad(
            nodes.feature,
            geosparql::HAS_BOUNDING_BOX,
            nodes.geometry.clone(),
        ));
        quads.push(nodes.quad(nodes.geometry, rdf::TYPE, geosparql::GEOMETRY));
        quads.push(nodes.quad(nodes.geometry, rdf::TYPE, sf::ENVELOPE));
        quads.push(nodes.quad(
            nodes.geometry,
            geosparql::AS_WKT,
            wkt_literal(&Geometry::Polygon(envelope.to_polygon()), &table.srs),
        ));
        Ok(())
    }
}
