use thiserror::Error;

/// An error raised when a bounding box literal cannot be parsed.
///
/// The message explains the accepted notations, as this error is usually shown to a user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundingBoxParseError {
    /// The literal did not contain the expected number of coordinates.
    #[error(
        "Bounding box '{literal}' has {found} coordinates. Provide it as \"west,south,east,north\" \
         (optionally with a placeholder third and sixth value) or as the deprecated \
         \"west east south north\""
    )]
    WrongTokenCount {
        /// The literal as given.
        literal: String,
        /// The number of coordinates that were found.
        found: usize,
    },
    /// A coordinate is not a finite number.
    #[error("Bounding box coordinate '{token}' in '{literal}' is not a finite number")]
    InvalidCoordinate {
        /// The literal as given.
        literal: String,
        /// The offending token.
        token: String,
    },
}

/// An error raised when an identifier for a table, row or column can not be turned into an IRI.
#[derive(Debug, Error)]
#[error("Could not mint an IRI for '{name}' against base <{base}>: {error}")]
pub struct MintIriError {
    /// The base IRI.
    pub base: String,
    /// The local name that was resolved against the base.
    pub name: String,
    /// The underlying error.
    #[source]
    pub error: oxiri::IriParseError,
}
