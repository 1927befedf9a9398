//! Shared foundational types for the routing-resource graph workspace.
//!
//! Currently this is the [`ContentHash`] used both to fingerprint graph
//! state and to checksum cached graph artifacts.

#![warn(missing_docs)]

pub mod hash;

pub use hash::ContentHash;
