use super::definition::is_wkt;
use super::projection::{Projection, Transformer};
use crate::error::CrsError;
use async_trait::async_trait;
use rdf_geopackage_common::SpatialReferenceSystem;
use rdf_geopackage_model::BoundingBox;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The default registry URL. `{code}` is replaced by the numeric EPSG code.
pub const DEFAULT_EPSG_REGISTRY: &str = "https://epsg.io/{code}.proj4";

/// Fetches definitions of EPSG codes that are unknown locally.
#[async_trait]
pub trait DefinitionFetcher: Send + Sync {
    /// Returns the PROJ or WKT definition of the numeric EPSG `code`.
    async fn fetch(&self, code: &str) -> Result<String, String>;
}

/// Fetches definitions from an [epsg.io](https://epsg.io) compatible registry.
#[derive(Debug, Clone)]
pub struct EpsgRegistry {
    client: reqwest::Client,
    url_template: String,
}

impl EpsgRegistry {
    /// `url_template` must contain `{code}`.
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url_template: url_template.into(),
        }
    }
}

impl Default for EpsgRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_EPSG_REGISTRY)
    }
}

#[async_trait]
impl DefinitionFetcher for EpsgRegistry {
    async fn fetch(&self, code: &str) -> Result<String, String> {
        let url = self.url_template.replace("{code}", code);
        tracing::debug!("Fetching the definition of EPSG:{code} from {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| error.to_string())?;
        let definition = response.text().await.map_err(|error| error.to_string())?;
        if definition.trim().is_empty() {
            return Err(format!("{url} returned an empty definition"));
        }
        Ok(definition)
    }
}

/// Turns CRS codes and definitions into [Projection]s.
///
/// Accepted inputs are `EPSG:<code>` codes, which are looked up locally and then fetched from the
/// registry, PROJ strings and WKT definitions. Every resolved projection is cached by its input.
#[derive(Clone, Default)]
pub struct CrsResolver {
    fetcher: Option<Arc<dyn DefinitionFetcher>>,
    cache: HashMap<String, Arc<Projection>>,
}

impl CrsResolver {
    /// A resolver that only knows the local projection database.
    pub fn offline() -> Self {
        Self::default()
    }

    /// A resolver that falls back to `fetcher` for unknown EPSG codes.
    pub fn with_fetcher(fetcher: Arc<dyn DefinitionFetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
            cache: HashMap::new(),
        }
    }

    /// Resolves a CRS code such as `EPSG:28992`, a PROJ string or a WKT definition.
    pub async fn resolve(&mut self, crs: &str) -> Result<Arc<Projection>, CrsError> {
        let crs = crs.trim();
        if let Some(projection) = self.cache.get(crs) {
            return Ok(Arc::clone(projection));
        }
        let projection = Arc::new(self.resolve_uncached(crs).await?);
        self.cache.insert(crs.to_owned(), Arc::clone(&projection));
        Ok(projection)
    }

    /// Resolves the CRS of a table.
    ///
    /// EPSG systems are resolved by their code, and by their definition if the code is not
    /// available. Other systems are resolved by their definition, which must be a PROJ string or
    /// WKT.
    pub async fn resolve_srs(
        &mut self,
        srs: &SpatialReferenceSystem,
    ) -> Result<Arc<Projection>, CrsError> {
        let code = srs.code();
        let has_definition = is_definition(&srs.definition);
        if srs.organization.eq_ignore_ascii_case("epsg") {
            match self.resolve(&code).await {
                Err(error) if has_definition => {
                    tracing::debug!("Using the stored definition of {code}: {error}");
                }
                resolved => return resolved,
            }
        } else if !has_definition {
            return Err(CrsError::UnknownScheme { code });
        }

        let definition = srs.definition.trim();
        if let Some(projection) = self.cache.get(definition) {
            return Ok(Arc::clone(projection));
        }
        let projection = Projection::from_definition(code.as_str(), definition).map_err(
            |error| match error {
                CrsError::InvalidDefinition { reason, .. } => {
                    CrsError::UnusableDefinition { code, reason }
                }
                error => error,
            },
        )?;
        let projection = Arc::new(projection);
        self.cache
            .insert(definition.to_owned(), Arc::clone(&projection));
        Ok(projection)
    }

    /// Returns the transformer from `crs` to WGS84.
    pub async fn transformer_to_wgs84(&mut self, crs: &str) -> Result<Transformer, CrsError> {
        let source = self.resolve(crs).await?;
        let target = self.wgs84()?;
        Ok(Transformer::new(source, target))
    }

    /// Reprojects a bounding box given in `crs` to WGS84.
    pub async fn bounding_box_to_wgs84(
        &mut self,
        bbox: &BoundingBox,
        crs: &str,
    ) -> Result<BoundingBox, CrsError> {
        if is_wgs84_code(crs) {
            return Ok(*bbox);
        }
        let transformer = self.transformer_to_wgs84(crs).await?;
        let transformed = transformer.transform_bounding_box(bbox)?;
        tracing::info!(
            "Bounding box {bbox} in {} is {transformed} in WGS84",
            transformer.source().name()
        );
        Ok(transformed)
    }

    /// Returns the WGS84 projection.
    pub fn wgs84(&mut self) -> Result<Arc<Projection>, CrsError> {
        if let Some(projection) = self.cache.get(super::WGS84_CODE) {
            return Ok(Arc::clone(projection));
        }
        let projection = Arc::new(Projection::wgs84()?);
        self.cache
            .insert(super::WGS84_CODE.to_owned(), Arc::clone(&projection));
        Ok(projection)
    }

    async fn resolve_uncached(&self, crs: &str) -> Result<Projection, CrsError> {
        if is_definition(crs) {
            return Projection::from_definition(crs, crs);
        }
        let Some(code) = crs
            .split_once(':')
            .filter(|(scheme, _)| scheme.trim().eq_ignore_ascii_case("epsg"))
            .map(|(_, code)| code.trim())
        else {
            return Err(CrsError::UnknownScheme {
                code: crs.to_owned(),
            });
        };
        let name = format!("EPSG:{code}");
        if let Some(projection) = code
            .parse::<u16>()
            .ok()
            .and_then(Projection::from_epsg_code)
        {
            return Ok(projection);
        }

        let Some(fetcher) = &self.fetcher else {
            return Err(CrsError::Fetch {
                code: name,
                reason: "the code is not in the local projection database".to_owned(),
            });
        };
        if code.is_empty() || !code.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(CrsError::Fetch {
                code: name,
                reason: "EPSG codes are numeric".to_owned(),
            });
        }
        let definition = fetcher
            .fetch(code)
            .await
            .map_err(|reason| CrsError::Fetch {
                code: name.clone(),
                reason,
            })?;
        Projection::from_definition(name, &definition)
    }
}

impl fmt::Debug for CrsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrsResolver")
            .field("online", &self.fetcher.is_some())
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// Returns whether `crs` is a PROJ string or WKT rather than a code.
fn is_definition(crs: &str) -> bool {
    crs.trim_start().starts_with('+') || is_wkt(crs)
}

/// Returns whether `crs` is the code of WGS84.
pub fn is_wgs84_code(crs: &str) -> bool {
    crs.trim()
        .split_once(':')
        .is_some_and(|(scheme, code)| {
            scheme.trim().eq_ignore_ascii_case("epsg") && code.trim() == "4326"
        })
}
