//! Error types for routing-resource graph construction.

use crate::ids::{RrEdgeId, RrNodeId};
use crate::storage::GraphState;
use rrg_arch::{ArchError, SwitchId};

/// Errors produced while building, reordering or mutating a graph.
///
/// Every error aborts the operation that raised it. Multi-step operations
/// commit all-or-nothing, so the builder is left as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum RrGraphError {
    /// An attribute was set that is meaningless or inconsistent for the node's kind.
    #[error("node {node}: invalid {attribute}: {reason}")]
    InvalidAttribute {
        /// The node being modified.
        node: RrNodeId,
        /// The attribute that was rejected.
        attribute: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Coordinates or layer fall outside the device grid.
    #[error("node {node}: geometry out of bounds: {reason}")]
    OutOfBoundsGeometry {
        /// The node being modified.
        node: RrNodeId,
        /// Which bound was violated.
        reason: String,
    },

    /// A topology mutator was called after edges were partitioned.
    #[error("{operation} is not allowed in the {state} state")]
    FinalizedStateViolation {
        /// The rejected operation.
        operation: &'static str,
        /// The state the storage was in.
        state: GraphState,
    },

    /// An operation needing the partitioned edge form ran while building.
    #[error("{operation} requires finalized edges")]
    NotFinalized {
        /// The rejected operation.
        operation: &'static str,
    },

    /// The spatial lookup disagrees with node attributes.
    #[error("spatial lookup inconsistency: {reason}")]
    LookupInconsistency {
        /// Description of the disagreement.
        reason: String,
    },

    /// A wire still straddles a die boundary after the interposer pass.
    #[error("{violations} wire(s) still cross a cut; first: node {node} at row {cut}")]
    MutationInvariantViolation {
        /// Number of (node, cut) pairs found.
        violations: usize,
        /// The first offending node.
        node: RrNodeId,
        /// The cut it straddles.
        cut: u16,
    },

    /// A node handle outside the storage.
    #[error("unknown node {node} (graph has {len} nodes)")]
    UnknownNode {
        /// The offending handle.
        node: RrNodeId,
        /// Node count at the time of the call.
        len: usize,
    },

    /// An edge handle outside the storage.
    #[error("unknown edge {edge} (graph has {len} edges)")]
    UnknownEdge {
        /// The offending handle.
        edge: RrEdgeId,
        /// Edge count at the time of the call.
        len: usize,
    },

    /// A switch index outside the switch table.
    #[error("unknown switch {switch} (switch table has {len} entries)")]
    UnknownSwitch {
        /// The offending switch.
        switch: SwitchId,
        /// Switch table size.
        len: usize,
    },

    /// The per-node edge ranges no longer match the edge columns.
    #[error("edge partition is stale at node {node}")]
    PartitionMismatch {
        /// The first node whose range is wrong.
        node: RrNodeId,
    },

    /// A node permutation that is not a bijection over the node set.
    #[error("invalid node permutation: {reason}")]
    InvalidPermutation {
        /// What is wrong with it.
        reason: String,
    },

    /// A configured cut row lies outside the grid.
    #[error("interposer cut at row {cut} is outside a grid of height {height}")]
    InvalidCut {
        /// The offending row.
        cut: u16,
        /// Grid height.
        height: u16,
    },

    /// Crossing switches would not be slower than their base switch.
    #[error("interposer delay multiplier must be a finite value >= 1.0 (got {multiplier})")]
    InvalidDelayMultiplier {
        /// The configured multiplier.
        multiplier: f64,
    },

    /// Architecture-derived data could not be computed.
    #[error(transparent)]
    Arch(#[from] ArchError),

    /// Encoding graph state for fingerprinting failed.
    #[error("failed to encode graph state: {0}")]
    Encoding(String),
}

/// Result alias for graph operations.
pub type RrGraphResult<T> = Result<T, RrGraphError>;
