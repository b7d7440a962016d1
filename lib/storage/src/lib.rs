#![doc(test(attr(deny(warnings))))]

//! Contains the source stores that can be converted by [RDF GeoPackage](https://docs.rs/rdf-geopackage/).
//!
//! - [GeoPackage](geopackage::GeoPackage) reads an [OGC GeoPackage](https://www.geopackage.org/)
//!   file through SQLite.
//! - [MemSourceStore](memory::MemSourceStore) holds its tables in memory.

pub mod geopackage;
pub mod memory;
