//! Geometry serialization strategies.
//!
//! Each strategy maps the geometry of a feature to quads in one convention, e.g., as a
//! [GeoSPARQL](https://docs.ogc.org/is/22-047r1/22-047r1.html) WKT literal. Several strategies may
//! be active in a single run. Their quads are concatenated per feature.

mod as_geojson;
mod as_wkt;
mod bbox;
mod centroid;
mod metrics;

pub use as_geojson::GeoJsonSerialization;
pub use as_wkt::WktSerialization;
pub use bbox::BoundingBoxGeometry;
pub use centroid::CentroidGeometry;
pub use metrics::FeatureMetrics;

use crate::crs::Transformer;
use crate::error::{CrsError, GeometryError};
use geo::Geometry;
use rdf_geopackage_common::{SpatialReferenceSystem, TableInfo};
use rdf_geopackage_model::vocab::geo as geosparql;
use rdf_geopackage_model::{Literal, NamedNode, Quad, Subject};
use std::borrow::Cow;
use wkt::ToWkt;

/// A strategy that maps a geometry to quads.
pub trait GeometrySerialization: Send + Sync {
    /// The id under which the strategy is registered.
    fn id(&self) -> &'static str;

    /// Whether the strategy describes a geometry of its own, e.g., a bounding box. Such a strategy
    /// gets a fresh geometry node instead of the node shared by the other strategies.
    fn requires_separate_geometry_subject(&self, _table: &FeatureTableContext) -> bool {
        false
    }

    /// Whether the strategy needs the geometry in WGS84.
    fn requires_wgs84(&self) -> bool {
        false
    }

    /// Appends the quads that describe `geometry` to `quads`.
    ///
    /// On error, the quads appended so far are discarded by the caller.
    fn quads(
        &self,
        geometry: &Geometry<f64>,
        nodes: &GeometryNodes<'_>,
        table: &FeatureTableContext,
        quads: &mut Vec<Quad>,
    ) -> Result<(), GeometryError>;
}

/// The nodes a [GeometrySerialization] attaches its quads to.
#[derive(Debug, Clone, Copy)]
pub struct GeometryNodes<'a> {
    /// The feature that owns the geometry.
    pub feature: &'a Subject,
    /// The node that stands for the geometry.
    pub geometry: &'a Subject,
    /// The graph of the feature table.
    pub graph: &'a NamedNode,
}

impl GeometryNodes<'_> {
    pub(crate) fn quad(
        &self,
        subject: &Subject,
        predicate: impl Into<NamedNode>,
        object: impl Into<rdf_geopackage_model::Term>,
    ) -> Quad {
        Quad::new(subject.clone(), predicate, object, self.graph.clone())
    }
}

/// What a geometry strategy knows about the feature table it serializes.
#[derive(Debug, Clone)]
pub struct FeatureTableContext {
    pub table: TableInfo,
    pub srs: SpatialReferenceSystem,
    /// The transformer from the table CRS to WGS84, if the CRS could be resolved.
    to_wgs84: Result<Transformer, CrsError>,
}

impl FeatureTableContext {
    pub fn new(
        table: TableInfo,
        srs: SpatialReferenceSystem,
        to_wgs84: Result<Transformer, CrsError>,
    ) -> Self {
        Self {
            table,
            srs,
            to_wgs84,
        }
    }

    /// Returns the geometry in WGS84, reprojecting it if the table uses another CRS.
    pub fn to_wgs84<'a>(
        &self,
        geometry: &'a Geometry<f64>,
    ) -> Result<Cow<'a, Geometry<f64>>, GeometryError> {
        if self.srs.is_wgs84() {
            return Ok(Cow::Borrowed(geometry));
        }
        let transformer = self.to_wgs84.as_ref().map_err(Clone::clone)?;
        Ok(Cow::Owned(transformer.transform_geometry(geometry)?))
    }
}

/// Returns the OGC IRI of a CRS, e.g., `http://www.opengis.net/def/crs/EPSG/0/4326`.
pub fn srs_iri(srs: &SpatialReferenceSystem) -> String {
    format!(
        "http://www.opengis.net/def/crs/{}/0/{}",
        srs.organization.to_ascii_uppercase(),
        srs.organization_coordsys_id
    )
}

/// Builds a `geo:wktLiteral` that is tagged with the table CRS.
pub fn wkt_literal(geometry: &Geometry<f64>, srs: &SpatialReferenceSystem) -> Literal {
    Literal::new_typed_literal(
        format!("<{}> {}", srs_iri(srs), geometry.wkt_string()),
        geosparql::WKT_LITERAL,
    )
}

/// Returns the Simple Features type name of a geometry, e.g., `LINESTRING`.
pub fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "POINT",
        Geometry::Line(_) => "LINE",
        Geometry::LineString(_) => "LINESTRING",
        Geometry::Polygon(_) => "POLYGON",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
        Geometry::Rect(_) => "ENVELOPE",
        Geometry::Triangle(_) => "TRIANGLE",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crs::{Projection, Transformer};
    use rdf_geopackage_common::TableKind;
    use rdf_geopackage_model::BlankNode;
    use std::sync::Arc;

    pub(crate) fn context(srs: SpatialReferenceSystem) -> FeatureTableContext {
        let code = u16::try_from(srs.organization_coordsys_id).unwrap_or(0);
        let to_wgs84 = Projection::from_epsg_code(code)
            .ok_or(CrsError::NotPrepared { code: srs.code() })
            .map(|source| {
                Transformer::new(Arc::new(source), Arc::new(Projection::wgs84().unwrap()))
            });
        FeatureTableContext::new(
            TableInfo::new("places", TableKind::Features),
            srs,
            to_wgs84,
        )
    }

    pub(crate) fn serialize(
        strategy: &dyn GeometrySerialization,
        geometry: &Geometry<f64>,
        srs: SpatialReferenceSystem,
    ) -> Result<Vec<Quad>, GeometryError> {
        let feature = Subject::from(BlankNode::new_unchecked("feature"));
        let geometry_node = Subject::from(BlankNode::new_unchecked("geometry"));
        let graph = NamedNode::new_unchecked("http://example.com/places");
        let nodes = GeometryNodes {
            feature: &feature,
            geometry: &geometry_node,
            graph: &graph,
        };
        let mut quads = Vec::new();
        strategy.quads(geometry, &nodes, &context(srs), &mut quads)?;
        Ok(quads)
    }

    #[test]
    fn srs_iri_upper_cases_the_organization() {
        let srs = SpatialReferenceSystem {
            srs_id: 1,
            organization: "epsg".to_owned(),
            organization_coordsys_id: 28992,
            definition: String::new(),
        };
        assert_eq!(srs_iri(&srs), "http://www.opengis.net/def/crs/EPSG/0/28992");
    }

    #[test]
    fn wkt_literals_are_tagged() {
        let literal = wkt_literal(
            &Geometry::Point(geo::point!(x: 1.0, y: 2.0)),
            &SpatialReferenceSystem::wgs84(),
        );
        assert_eq!(
            literal.value(),
            "<http://www.opengis.net/def/crs/EPSG/0/4326> POINT(1 2)"
        );
        assert_eq!(literal.datatype(), geosparql::WKT_LITERAL);
    }

    #[test]
    fn unresolved_projections_fail_reprojection() {
        let context = FeatureTableContext::new(
            TableInfo::new("t", TableKind::Features),
            SpatialReferenceSystem::epsg(28992),
            Err(CrsError::NotPrepared {
                code: "EPSG:28992".to_owned(),
            }),
        );
        assert!(context
            .to_wgs84(&Geometry::Point(geo::point!(x: 1.0, y: 2.0)))
            .is_err());
    }
}
