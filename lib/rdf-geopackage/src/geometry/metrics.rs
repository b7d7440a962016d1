use super::{geometry_type_name, FeatureTableContext, GeometryNodes, GeometrySerialization};
use crate::error::GeometryError;
use geo::{Geodesic, GeodesicArea, Geometry, Length};
use rdf_geopackage_model::vocab::{geo as geosparql, xsd};
use rdf_geopackage_model::{Literal, Quad};

/// Geometry types that have a length.
const LENGTH_TYPES: [&str; 6] = [
    "CURVE",
    "LINE",
    "LINEARRING",
    "LINESTRING",
    "MULTICURVE",
    "MULTILINESTRING",
];

/// Geometry types that have an area.
const AREA_TYPES: [&str; 8] = [
    "ENVELOPE",
    "MULTIPOLYGON",
    "MULTISURFACE",
    "POLYGON",
    "POLYHEDRALSURFACE",
    "SURFACE",
    "TIN",
    "TRIANGLE",
];

/// Describes the geodesic length and area of the feature on the WGS84 ellipsoid.
///
/// - `geo:hasMetricLength` in meters, for curves
/// - `geo:hasMetricArea` in square meters, for surfaces
///
/// Values are rounded to three decimals. Geometries of other types, such as points, get no
/// quads at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureMetrics;

impl FeatureMetrics {
    pub fn supports_length(type_name: &str) -> bool {
        LENGTH_TYPES.contains(&type_name.to_ascii_uppercase().as_str())
    }

    pub fn supports_area(type_name: &str) -> bool {
        AREA_TYPES.contains(&type_name.to_ascii_uppercase().as_str())
    }
}

impl GeometrySerialization for FeatureMetrics {
    fn id(&self) -> &'static str {
        "length-area"
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
        let type_name = geometry_type_name(geometry);
        let has_length = Self::supports_length(type_name);
        let has_area = Self::supports_area(type_name);
        if !has_length && !has_area {
            return Ok(());
        }
        let geometry = table.to_wgs84(geometry)?;
        if has_length {
            quads.push(nodes.quad(
                nodes.feature,
                geosparql::HAS_METRIC_LENGTH,
                metric_literal(geodesic_length(&geometry)),
            ));
        }
        if has_area {
            quads.push(nodes.quad(
                nodes.feature,
                geosparql::HAS_METRIC_AREA,
                metric_literal(geodesic_area(&geometry)),
            ));
        }
        Ok(())
    }
}

fn geodesic_length(geometry: &Geometry<f64>) -> f64 {
    match geometry {
        Geometry::Line(line) => line.length::<Geodesic>(),
        Geometry::LineString(line_string) => line_string.length::<Geodesic>(),
        Geometry::MultiLineString(lines) => lines.length::<Geodesic>(),
        _ => 0.0,
    }
}

fn geodesic_area(geometry: &Geometry<f64>) -> f64 {
    match geometry {
        Geometry::Polygon(polygon) => polygon.geodesic_area_unsigned(),
        Geometry::MultiPolygon(polygons) => polygons.geodesic_area_unsigned(),
        Geometry::Rect(rect) => rect.geodesic_area_unsigned(),
        Geometry::Triangle(triangle) => triangle.geodesic_area_unsigned(),
        _ => 0.0,
    }
}

/// Rounds to millimeters (or square millimeters).
fn metric_literal(value: f64) -> Literal {
    let rounded = (value * 1000.0).round() / 1000.0;
    Literal::new_typed_literal(rounded.to_string(), xsd::DOUBLE)
}
