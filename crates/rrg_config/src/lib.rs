//! Parsing and validation of `rrgraph.toml` graph-construction options.
//!
//! The options select the node reordering policy and configure the
//! multi-die (interposer) mutation pass. Every table is optional; an empty
//! file yields [`GraphOptions::default`], which disables both passes.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_options, load_options_from_str, OPTIONS_FILE_NAME};
pub use types::*;
