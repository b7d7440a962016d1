use super::definition::{is_wkt, WktCrs};
use crate::error::CrsError;
use geo::{Coord, Geometry, MapCoords};
use proj4rs::Proj;
use rdf_geopackage_model::BoundingBox;
use std::fmt;
use std::sync::Arc;

/// The PROJ definition of WGS84, the CRS of GeoJSON and of bounding-box filters.
pub const WGS84_DEFINITION: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// The code of WGS84.
pub const WGS84_CODE: &str = "EPSG:4326";

/// The number of segments per edge when a bounding box is reprojected.
const BOUNDING_BOX_EDGE_STEPS: u32 = 20;

/// The latitude at which the Mercator projection of a sphere becomes a square.
const MERCATOR_LATITUDE_LIMIT: f64 = 85.051_128_779_806_59;

/// A coordinate reference system that the projection engine understands.
pub struct Projection {
    /// The code (e.g., `EPSG:3857`) or the definition this projection was built from.
    name: String,
    proj: Proj,
}

impl Projection {
    /// Builds a projection from a PROJ string, e.g., `+proj=merc +a=6378137 +b=6378137`.
    pub fn from_proj_string(
        name: impl Into<String>,
        definition: &str,
    ) -> Result<Self, CrsError> {
        let proj = Proj::from_proj_string(definition.trim()).map_err(|error| {
            CrsError::InvalidDefinition {
                definition: definition.to_owned(),
                reason: error.to_string(),
            }
        })?;
        Ok(Self {
            name: name.into(),
            proj,
        })
    }

    /// Builds a projection from a PROJ string or a WKT definition.
    ///
    /// WKT systems with an `EPSG` authority that is known locally are taken from the local
    /// projection database. Others are translated into a PROJ string.
    pub fn from_definition(name: impl Into<String>, definition: &str) -> Result<Self, CrsError> {
        let definition = definition.trim();
        if !is_wkt(definition) {
            return Self::from_proj_string(name, definition);
        }
        let invalid = |reason: String| CrsError::InvalidDefinition {
            definition: definition.to_owned(),
            reason,
        };
        let crs = WktCrs::parse(definition).map_err(invalid)?;
        if let Some(proj) = crs
            .epsg_code()
            .and_then(|code| Proj::from_epsg_code(code).ok())
        {
            return Ok(Self {
                name: name.into(),
                proj,
            });
        }
        let proj_string = crs.to_proj_string().map_err(invalid)?;
        tracing::debug!("Translated the WKT definition into {proj_string}");
        let proj = Proj::from_proj_string(&proj_string)
            .map_err(|error| invalid(format!("{error} (as {proj_string})")))?;
        Ok(Self {
            name: name.into(),
            proj,
        })
    }

    /// Looks up an EPSG code in the local projection database.
    pub fn from_epsg_code(code: u16) -> Option<Self> {
        let proj = Proj::from_epsg_code(code).ok()?;
        Some(Self {
            name: format!("EPSG:{code}"),
            proj,
        })
    }

    pub fn wgs84() -> Result<Self, CrsError> {
        Self::from_proj_string(WGS84_CODE, WGS84_DEFINITION)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn is_latlong(&self) -> bool {
        self.proj.is_latlong()
    }

    fn is_mercator(&self) -> bool {
        matches!(self.proj.projname(), "merc" | "webmerc")
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Transforms coordinates from one [Projection] to another.
///
/// Geographic coordinates are given and returned in degrees.
#[derive(Debug, Clone)]
pub struct Transformer {
    source: Arc<Projection>,
    target: Arc<Projection>,
}

impl Transformer {
    pub fn new(source: Arc<Projection>, target: Arc<Projection>) -> Self {
        Self { source, target }
    }

    pub fn source(&self) -> &Projection {
        &self.source
    }

    pub fn target(&self) -> &Projection {
        &self.target
    }

    pub fn transform_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, CrsError> {
        let mut point = if self.source.is_latlong() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        proj4rs::transform::transform(&self.source.proj, &self.target.proj, &mut point)
            .map_err(|error| self.error(error.to_string()))?;
        let (x, y) = if self.target.is_latlong() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if x.is_finite() && y.is_finite() {
            Ok(Coord { x, y })
        } else {
            Err(self.error(format!(
                "({}, {}) has no finite image",
                coord.x, coord.y
            )))
        }
    }

    pub fn transform_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, CrsError> {
        geometry.try_map_coords(|coord| self.transform_coord(coord))
    }

    /// Transforms a bounding box and returns the box that covers the transformed box.
    ///
    /// Edges are sampled, as they are not straight lines in most target systems. Geographic boxes
    /// are first clamped to the area the target projection can represent. Samples without an image
    /// are left out; the transformation only fails if no sample has one.
    pub fn transform_bounding_box(&self, bbox: &BoundingBox) -> Result<BoundingBox, CrsError> {
        let mut last_error = None;
        let points = self
            .clamp_to_target(bbox)
            .edge_points(BOUNDING_BOX_EDGE_STEPS)
            .into_iter()
            .filter_map(|(x, y)| match self.transform_coord(Coord { x, y }) {
                Ok(coord) => Some((coord.x, coord.y)),
                Err(error) => {
                    tracing::trace!("Skipping a bounding box sample: {error}");
                    last_error = Some(error);
                    None
                }
            })
            .collect::<Vec<_>>();
        BoundingBox::covering(points).ok_or_else(|| {
            last_error.unwrap_or_else(|| self.error("the bounding box is empty".into()))
        })
    }

    fn clamp_to_target(&self, bbox: &BoundingBox) -> BoundingBox {
        if !self.source.is_latlong() {
            return *bbox;
        }
        let latitude_limit = if self.target.is_mercator() {
            MERCATOR_LATITUDE_LIMIT
        } else {
            90.0
        };
        BoundingBox::new(
            bbox.west.clamp(-180.0, 180.0),
            bbox.south.clamp(-latitude_limit, latitude_limit),
            bbox.east.clamp(-180.0, 180.0),
            bbox.north.clamp(-latitude_limit, latitude_limit),
        )
    }

    fn error(&self, reason: String) -> CrsError {
        CrsError::Transform {
            from: self.source.name.clone(),
            to: self.target.name.clone(),
            reason,
        }
    }
}
