use crate::registry::Namespace;
use rdf_geopackage_common::SourceError;
use rdf_geopackage_model::{IriParseError, MintIriError};
use std::error::Error;
use std::fmt;
use std::io;

/// An error raised when a strategy id is not registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {namespace} model '{id}'. Known models: {}", known.join(", "))]
pub struct LookupError {
    pub namespace: Namespace,
    pub id: String,
    /// The registered ids of the namespace, in registration order.
    pub known: Vec<String>,
}

/// An error raised while resolving a coordinate reference system or transforming coordinates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrsError {
    /// The code has a scheme other than `EPSG`.
    #[error("Code '{code}' unknown. Supply a projection definition (PROJ string or WKT) instead")]
    UnknownScheme { code: String },
    /// The code is an EPSG code that is not known locally and could not be fetched.
    #[error("Code '{code}' could not be fetched. Supply a projection definition (PROJ string or WKT) instead: {reason}")]
    Fetch { code: String, reason: String },
    /// The definition could not be parsed by the projection engine.
    #[error("Projection definition '{definition}' could not be parsed: {reason}")]
    InvalidDefinition { definition: String, reason: String },
    /// The definition stored with a table CRS could not be used.
    #[error("The definition of CRS {code} could not be used: {reason}")]
    UnusableDefinition { code: String, reason: String },
    /// The CRS was not resolved before the generation started.
    #[error("The CRS {code} was not resolved")]
    NotPrepared { code: String },
    /// A coordinate could not be transformed.
    #[error("Coordinates could not be transformed from {from} to {to}: {reason}")]
    Transform {
        from: String,
        to: String,
        reason: String,
    },
}

/// An error raised while generating quads. Stops the generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The source store failed.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// A model id is unknown.
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// A CRS could not be resolved.
    #[error(transparent)]
    Crs(#[from] CrsError),
    /// A table or row IRI could not be built.
    #[error(transparent)]
    Iri(#[from] MintIriError),
    /// The base IRI is invalid.
    #[error("Invalid base IRI '{iri}': {error}")]
    InvalidBaseIri {
        /// The IRI itself.
        iri: String,
        /// The parsing error.
        #[source]
        error: IriParseError,
    },
}

impl From<GenerationError> for io::Error {
    #[inline]
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::Source(error) => error.into(),
            GenerationError::Lookup(_)
            | GenerationError::Crs(_)
            | GenerationError::Iri(_)
            | GenerationError::InvalidBaseIri { .. } => {
                Self::new(io::ErrorKind::InvalidInput, error.to_string())
            }
        }
    }
}

/// An error raised by a single geometry serialization. Only skips the geometry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    /// The geometry could not be reprojected to WGS84.
    #[error(transparent)]
    Crs(#[from] CrsError),
    /// The geometry has no coordinates the serialization could use.
    #[error("{0} geometry is empty")]
    Empty(&'static str),
    /// The geometry could not be encoded.
    #[error("{0}")]
    Encoding(String),
}

/// What stopped a [QuadStream](crate::stream::QuadStream).
#[derive(Debug, thiserror::Error)]
pub enum StreamFailure {
    /// Generating the next quad failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The consumer failed to take a quad.
    #[error(transparent)]
    Sink(#[from] io::Error),
    /// Releasing the source failed while no other error was in flight.
    #[error("Releasing the source failed: {0}")]
    Release(#[source] GenerationError),
}

/// An error that stopped a [QuadStream](crate::stream::QuadStream).
///
/// If releasing the source failed after another error had already stopped the stream, the
/// original error is kept as the cause and the release error is available through
/// [StreamError::release_failure].
#[derive(Debug)]
pub struct StreamError {
    failure: StreamFailure,
    release_failure: Option<GenerationError>,
}

impl StreamError {
    pub fn failure(&self) -> &StreamFailure {
        &self.failure
    }

    pub fn release_failure(&self) -> Option<&GenerationError> {
        self.release_failure.as_ref()
    }

    pub fn into_failure(self) -> StreamFailure {
        self.failure
    }

    pub(crate) fn with_release_failure(mut self, error: GenerationError) -> Self {
        self.release_failure = Some(error);
        self
    }
}

impl From<StreamFailure> for StreamError {
    fn from(failure: StreamFailure) -> Self {
        Self {
            failure,
            release_failure: None,
        }
    }
}

impl From<GenerationError> for StreamError {
    fn from(error: GenerationError) -> Self {
        StreamFailure::Generation(error).into()
    }
}

impl From<io::Error> for StreamError {
    fn from(error: io::Error) -> Self {
        StreamFailure::Sink(error).into()
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.failure)?;
        if let Some(release_failure) = &self.release_failure {
            write!(f, " (releasing the source failed as well: {release_failure})")?;
        }
        Ok(())
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.failure)
    }
}

impl From<StreamError> for io::Error {
    #[inline]
    fn from(error: StreamError) -> Self {
        match error.failure {
            StreamFailure::Sink(error) => error,
            StreamFailure::Generation(error) | StreamFailure::Release(error) => error.into(),
        }
    }
}
