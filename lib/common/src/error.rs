use std::error::Error;
use std::io;

/// An error related to reading a source store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SourceError {
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Error related to data corruption.
    #[error(transparent)]
    Corruption(#[from] CorruptionError),
    /// The requested table does not exist in the store.
    #[error("Table '{0}' does not exist")]
    UnknownTable(String),
    /// The store has already been closed.
    #[error("The source store has been closed")]
    Closed,
    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl SourceError {
    /// Wraps any error of the underlying store implementation.
    pub fn other(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::Other(error.into())
    }
}

impl From<SourceError> for io::Error {
    #[inline]
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::Io(error) => error,
            SourceError::Corruption(error) => error.into(),
            SourceError::UnknownTable(_) => Self::new(io::ErrorKind::NotFound, error),
            SourceError::Closed => Self::new(io::ErrorKind::BrokenPipe, error),
            SourceError::Other(error) => Self::other(error),
        }
    }
}

/// An error returned if some content of the source is corrupted, e.g., missing metadata tables.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct CorruptionError(#[from] CorruptionErrorKind);

#[derive(Debug, thiserror::Error)]
enum CorruptionErrorKind {
    #[error("{0}")]
    Msg(String),
    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl CorruptionError {
    /// Builds an error from another error.
    #[inline]
    pub fn new(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self(CorruptionErrorKind::Other(error.into()))
    }

    /// Builds an error from a printable error message.
    #[inline]
    pub fn msg(msg: impl Into<String>) -> Self {
        Self(CorruptionErrorKind::Msg(msg.into()))
    }
}

impl From<CorruptionError> for io::Error {
    #[inline]
    fn from(error: CorruptionError) -> Self {
        Self::new(io::ErrorKind::InvalidData, error)
    }
}
