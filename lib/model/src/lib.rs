//! The data model shared by all RDF GeoPackage crates.
//!
//! Terms and quads are [oxrdf](https://docs.rs/oxrdf) types that are re-exported from here. On top
//! of these, this crate defines the values that are read from a source table, the rules that map
//! them to RDF literals, and the bounding box that is used to filter features.

mod bounding_box;
mod error;
mod iri;
mod value;
pub mod vocab;

pub use bounding_box::*;
pub use error::*;
pub use iri::*;
pub use value::*;

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::{
    BlankNode, BlankNodeRef, GraphName, GraphNameRef, IriParseError, Literal, LiteralRef,
    NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, QuadRef, Subject,
    SubjectRef, Term, TermRef,
};
