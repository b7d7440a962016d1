use super::{wkt_literal, FeatureTableContext, GeometryNodes, GeometrySerialization};
use crate::error::GeometryError;
use geo::Geometry;
use rdf_geopackage_model::vocab::{geo as geosparql, rdf};
use rdf_geopackage_model::Quad;

/// Serializes the geometry as a `geo:wktLiteral` in the CRS of its table.
///
/// ```text
/// _:feature geo:hasDefaultGeometry _:geometry .
/// _:geometry a geo:Geometry ;
///     geo:asWKT "<http://www.opengis.net/def/crs/EPSG/0/4326> POINT(1 2)"^^geo:wktLiteral .
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WktSerialization;

impl GeometrySerialization for WktSerialization {
    fn id(&self) -> &'static str {
        "wkt"
    }

    fn quads(
        &self,
        geometry: &Geometry<f64>,
        nodes: &GeometryNodes<'_>,
        table: &FeatureTableContext,
        quads: &mut Vec<Quad>,
    ) -> Result<(), GeometryError> {
        quads.push(nodes.quad(
            nodes.feature,
            geosparql::HAS_DEFAULT_GEOMETRY,
            nodes.geometry.clone(),
        ));
        quads.push(nodes.quad(nodes.geometry, rdf::TYPE, geosparql::GEOMETRY));
        quads.push(nodes.quad(
            nodes.geometry,
            geosparql::AS_WKT,
            wkt_literal(geometry, &table.srs),
        ));
        Ok(())
    }
}
