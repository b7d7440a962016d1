use super::{
    geometry_type_name, wkt_literal, FeatureTableContext, GeometryNodes, GeometrySerialization,
};
use crate::error::GeometryError;
use geo::{Centroid, Geometry};
use rdf_geopackage_model::vocab::{geo as geosparql, rdf, sf};
use rdf_geopackage_model::Quad;

/// Describes the centroid of the geometry as an `sf:Point`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidGeometry;

impl GeometrySerialization for CentroidGeometry {
    fn id(&self) -> &'static str {
        "centroid"
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
        let centroid = geometry
            .centroid()
            .ok_or(GeometryError::Empty(geometry_type_name(geometry)))?;
        quads.push(nodes.quad(nodes.feature, geosparql::HAS_CENTROID, nodes.geometry.clone()));
        quads.push(nodes.quad(nodes.geometry, rdf::TYPE, geosparql::GEOMETRY));
        quads.push(nodes.quad(nodes.geometry, rdf::TYPE, sf::POINT));
        quads.push(nodes.quad(
            nodes.geometry,
            geosparql::AS_WKT,
            wkt_literal(&Geometry::Point(centroid), &table.srs),
        ));
        Ok(())
    }
}
