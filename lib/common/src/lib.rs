//! The contract between the quad generator and the stores it reads from.
//!
//! A [SourceStore] lists attribute and feature tables and hands out cursors over their rows. The
//! cursors own everything they need, so they can outlive the borrow of the store that created them.

mod blank_node_mode;
pub mod error;
mod source;

pub use blank_node_mode::{BlankNodeFactory, BlankNodeMode};
pub use error::{CorruptionError, SourceError};
pub use source::*;

pub type SourceResult<T> = Result<T, SourceError>;
