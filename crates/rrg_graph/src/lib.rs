//! Routing-resource graph core for FPGA place and route.
//!
//! A routing-resource (RR) graph has one node per routable resource (wire
//! segments, block pins, and the logical source and sink of each pin class)
//! and one directed edge per programmable or fixed connection, labelled
//! with the switch that implements it.
//!
//! [`RrGraphBuilder`] owns everything mutable: compact node and edge
//! storage, a spatial lookup from `(layer, x, y, type, ptc, side)` to node,
//! string metadata for nodes and edges, and the switch table. Construction
//! ends with [`RrGraphBuilder::finish`], which runs the optional passes
//! ([node reordering](crate::reorder) and the
//! [multi-die interposer pass](crate::interposer)) and returns an immutable
//! [`RrGraph`]. Routers read it through [`RrGraphView`].

#![warn(missing_docs)]

pub mod builder;
pub mod error;
pub mod ids;
pub mod interposer;
pub mod lookup;
pub mod metadata;
pub mod permutation;
pub mod reorder;
pub mod storage;
pub mod types;
pub mod view;

pub use builder::RrGraphBuilder;
pub use error::{RrGraphError, RrGraphResult};
pub use ids::{EdgeRange, RrEdgeId, RrNodeId};
pub use interposer::{resolve_cuts, InterposerReport};
pub use lookup::{Location, SpatialLookup};
pub use metadata::{EdgeKey, EdgeMetadata, MetadataEntry, MetadataKey, MetadataStore, NodeMetadata};
pub use permutation::NodePermutation;
pub use storage::{GraphState, NodeStorage};
pub use types::*;
pub use view::{RrGraph, RrGraphView};

pub use rrg_arch::SwitchId;
pub use rrg_config::{GraphOptions, InterposerOptions, ReorderAlgorithm, ReorderOptions};
