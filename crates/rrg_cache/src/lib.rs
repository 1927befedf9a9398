//! On-disk artifacts for finished routing-resource graphs.
//!
//! A graph that took a long time to build can be written once with
//! [`write_graph`] and loaded by later runs with [`read_graph`]. Each file
//! carries a header with magic bytes, a format version and a checksum of
//! the payload, so stale or corrupted files are detected instead of
//! silently decoded.

#![warn(missing_docs)]

pub mod artifact;
pub mod error;

pub use artifact::{load_cached, read_graph, write_graph, GraphArtifactHeader};
pub use error::CacheError;
