#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod context;
pub mod crs;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod io;
pub mod models;
pub mod registry;
pub mod stream;
mod warnings;

pub use context::{ConversionOptions, GenerationContext};
pub use crs::{dataset_bounding_box, CrsResolver, EpsgRegistry};
pub use generator::{QuadGenerator, QuadSource};
pub use registry::{Namespace, StrategyRegistry};
pub use stream::{QuadStream, StreamState};
pub use warnings::{Warning, WarningCounter};

pub mod model {
    pub use rdf_geopackage_model::*;
}

pub mod common {
    pub use rdf_geopackage_common::*;
}

pub mod storage {
    pub use rdf_geopackage_storage::*;
}
