use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use oxrdf::vocab::xsd;
use oxrdf::Literal;
use oxsdatatypes::{Date, DateTime};
use std::str::FromStr;

/// A single cell value of a source table.
///
/// The variants follow the storage classes of the underlying store. Booleans and temporal values
/// are only distinguished if the table declares the column as such.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    /// A calendar date in its textual (`YYYY-MM-DD`) form.
    Date(String),
    /// A timestamp in its textual (ISO 8601) form.
    DateTime(String),
    Blob(Vec<u8>),
}

impl SourceValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SourceValue::Null)
    }

    /// Returns the value as an integer, if it is one. Used to read identifier columns.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SourceValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns a textual representation that can be used as the local part of an IRI.
    pub fn to_identifier(&self) -> Option<String> {
        match self {
            SourceValue::Integer(value) => Some(value.to_string()),
            SourceValue::Real(value) => Some(value.to_string()),
            SourceValue::Text(value) | SourceValue::Date(value) | SourceValue::DateTime(value) => {
                Some(value.clone())
            }
            SourceValue::Boolean(value) => Some(value.to_string()),
            SourceValue::Null | SourceValue::Blob(_) => None,
        }
    }
}

impl From<&str> for SourceValue {
    fn from(value: &str) -> Self {
        SourceValue::Text(value.to_owned())
    }
}

impl From<i64> for SourceValue {
    fn from(value: i64) -> Self {
        SourceValue::Integer(value)
    }
}

impl From<f64> for SourceValue {
    fn from(value: f64) -> Self {
        SourceValue::Real(value)
    }
}

impl From<bool> for SourceValue {
    fn from(value: bool) -> Self {
        SourceValue::Boolean(value)
    }
}

/// The datatype class a number is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericClass {
    /// Mapped to `xsd:integer`.
    Integer,
    /// Mapped to `xsd:double`.
    Double,
}

/// Classifies a number as integral or not.
///
/// A number without a fractional part is an [NumericClass::Integer], regardless of whether the
/// store holds it as an integer or as a real. Consumers of the generated RDF rely on this, e.g.,
/// a `REAL` column holding `3.0` produces `"3"^^xsd:integer`. Non-finite values are always
/// [NumericClass::Double].
pub fn classify_number(value: f64) -> NumericClass {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        NumericClass::Integer
    } else {
        NumericClass::Double
    }
}

/// Maps a source value to a typed literal.
///
/// - `Null` values produce no literal.
/// - Binary values produce an `xsd:base64Binary` literal if `include_binary` is set, and no literal
///   otherwise.
/// - Numbers are typed according to [classify_number].
/// - Dates and timestamps that are valid XSD lexical forms are typed as `xsd:date` and
///   `xsd:dateTime`. Others fall back to strings.
pub fn value_to_literal(value: &SourceValue, include_binary: bool) -> Option<Literal> {
    match value {
        SourceValue::Null => None,
        SourceValue::Blob(bytes) => include_binary
            .then(|| Literal::new_typed_literal(BASE64.encode(bytes), xsd::BASE_64_BINARY)),
        SourceValue::Boolean(value) => Some(Literal::from(*value)),
        SourceValue::Integer(value) => Some(Literal::from(*value)),
        SourceValue::Real(value) => Some(match classify_number(*value) {
            NumericClass::Integer => Literal::new_typed_literal(format!("{value:.0}"), xsd::INTEGER),
            NumericClass::Double => Literal::from(*value),
        }),
        SourceValue::Text(value) => Some(Literal::new_simple_literal(value.as_str())),
        SourceValue::Date(value) => Some(match Date::from_str(value) {
            Ok(date) => Literal::new_typed_literal(date.to_string(), xsd::DATE),
            Err(_) => Literal::new_simple_literal(value.as_str()),
        }),
        SourceValue::DateTime(value) => Some(match DateTime::from_str(value) {
            Ok(date_time) => Literal::new_typed_literal(date_time.to_string(), xsd::DATE_TIME),
            Err(_) => Literal::new_simple_literal(value.as_str()),
        }),
    }
}
