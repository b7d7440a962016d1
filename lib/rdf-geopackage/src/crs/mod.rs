//! Coordinate reference systems: resolving codes, reprojecting geometries and bounding boxes.
//!
//! Resolving a code may require a request to a remote registry, so all projections a conversion
//! needs are resolved up front into a [ProjectionCatalog]. Quad generation itself never waits.

mod definition;
mod projection;
mod resolver;

pub use projection::{Projection, Transformer, WGS84_CODE, WGS84_DEFINITION};
pub use resolver::{
    is_wgs84_code, CrsResolver, DefinitionFetcher, EpsgRegistry, DEFAULT_EPSG_REGISTRY,
};

use crate::context::GenerationContext;
use crate::error::{CrsError, GenerationError};
use rdf_geopackage_common::{SourceStore, SpatialReferenceSystem};
use rdf_geopackage_model::BoundingBox;
use std::collections::HashMap;
use std::sync::Arc;

/// The resolved CRS of every selected feature table, keyed by the CRS code.
///
/// A CRS that could not be resolved is kept with its error, which is only reported once a
/// geometry actually needs the projection.
#[derive(Debug, Clone)]
pub struct ProjectionCatalog {
    wgs84: Arc<Projection>,
    projections: HashMap<String, Result<Arc<Projection>, CrsError>>,
}

impl ProjectionCatalog {
    /// A catalog that only knows WGS84.
    pub fn new() -> Result<Self, CrsError> {
        Ok(Self {
            wgs84: Arc::new(Projection::wgs84()?),
            projections: HashMap::new(),
        })
    }

    /// Resolves the CRS of every feature table that `context` selects, if the conversion needs
    /// reprojection at all.
    pub async fn prepare(
        store: &impl SourceStore,
        context: &GenerationContext,
        resolver: &mut CrsResolver,
    ) -> Result<Self, GenerationError> {
        let mut catalog = Self {
            wgs84: resolver.wgs84()?,
            projections: HashMap::new(),
        };
        if !context.needs_projections() {
            return Ok(catalog);
        }
        for table in store.feature_tables()? {
            if !context.allows_layer(&table.name) {
                continue;
            }
            let srs = store.table_srs(&table)?;
            if srs.is_wgs84() || catalog.projections.contains_key(&srs.code()) {
                continue;
            }
            let projection = resolver.resolve_srs(&srs).await;
            if let Err(error) = &projection {
                tracing::debug!("The CRS of table '{}' is not available: {error}", table.name);
            }
            catalog.projections.insert(srs.code(), projection);
        }
        Ok(catalog)
    }

    /// Adds a resolved projection.
    pub fn insert(&mut self, srs: &SpatialReferenceSystem, projection: Arc<Projection>) {
        self.projections.insert(srs.code(), Ok(projection));
    }

    pub fn wgs84(&self) -> &Arc<Projection> {
        &self.wgs84
    }

    /// Returns the transformer from `srs` to WGS84.
    pub fn to_wgs84(&self, srs: &SpatialReferenceSystem) -> Result<Transformer, CrsError> {
        Ok(Transformer::new(self.lookup(srs)?, Arc::clone(&self.wgs84)))
    }

    /// Returns the transformer from WGS84 to `srs`.
    pub fn from_wgs84(&self, srs: &SpatialReferenceSystem) -> Result<Transformer, CrsError> {
        Ok(Transformer::new(Arc::clone(&self.wgs84), self.lookup(srs)?))
    }

    fn lookup(&self, srs: &SpatialReferenceSystem) -> Result<Arc<Projection>, CrsError> {
        if srs.is_wgs84() {
            return Ok(Arc::clone(&self.wgs84));
        }
        match self.projections.get(&srs.code()) {
            Some(projection) => projection.clone(),
            None => Err(CrsError::NotPrepared { code: srs.code() }),
        }
    }
}

/// Returns the WGS84 bounding box that covers the stored extents of all feature tables.
///
/// Each extent is reprojected to WGS84 before it widens the result. Tables without a stored
/// extent are ignored. [None] if no table has an extent.
pub async fn dataset_bounding_box(
    store: &impl SourceStore,
    resolver: &mut CrsResolver,
) -> Result<Option<BoundingBox>, GenerationError> {
    let mut result: Option<BoundingBox> = None;
    for table in store.feature_tables()? {
        let Some(extent) = store.table_extent(&table)? else {
            continue;
        };
        let srs = store.table_srs(&table)?;
        let extent = if srs.is_wgs84() {
            extent
        } else {
            let source = resolver.resolve_srs(&srs).await?;
            Transformer::new(source, resolver.wgs84()?).transform_bounding_box(&extent)?
        };
        result = Some(match result {
            Some(result) => result.union(&extent),
            None => extent,
        });
    }
    Ok(result)
}
