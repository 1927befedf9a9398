//! Read-only access to a finalized graph.
//!
//! [`RrGraphView`] borrows a builder, so the builder cannot change while a
//! view is alive. [`RrGraph`] is the owned, frozen result of
//! [`RrGraphBuilder::finish`].

use crate::builder::RrGraphBuilder;
use crate::error::{RrGraphError, RrGraphResult};
use crate::ids::{EdgeRange, RrEdgeId, RrNodeId};
use crate::lookup::{Location, SpatialLookup};
use crate::metadata::{EdgeKey, MetadataEntry};
use crate::storage::NodeStorage;
use crate::types::{Direction, NodeRect, RrSwitch, RrType, Side, SideSet};
use rrg_arch::SwitchId;
use rrg_common::ContentHash;
use serde::Serialize;

/// A borrowed, read-only view of a graph whose edges are partitioned.
///
/// Handle-taking methods panic on handles outside the graph.
#[derive(Debug, Clone, Copy)]
pub struct RrGraphView<'a> {
    graph: &'a RrGraphBuilder,
}

impl<'a> RrGraphView<'a> {
    pub(crate) fn new(graph: &'a RrGraphBuilder) -> Self {
        debug_assert!(graph.storage().is_partitioned());
        Self { graph }
    }

    fn storage(&self) -> &'a NodeStorage {
        self.graph.storage()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.storage().len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.storage().edge_count()
    }

    /// Every node handle in id order.
    pub fn node_ids(&self) -> impl Iterator<Item = RrNodeId> {
        self.storage().node_ids()
    }

    /// Node kind; `None` only for nodes never given one.
    pub fn node_type(&self, id: RrNodeId) -> Option<RrType> {
        self.storage().node_type(id)
    }

    /// Die layer.
    pub fn node_layer(&self, id: RrNodeId) -> u8 {
        self.storage().node_layer(id)
    }

    /// Occupied rectangle.
    pub fn node_rect(&self, id: RrNodeId) -> NodeRect {
        self.storage().node_rect(id)
    }

    /// Class, pin or track number.
    pub fn node_ptc_num(&self, id: RrNodeId) -> u16 {
        self.storage().node_ptc_num(id)
    }

    /// Signal direction.
    pub fn node_direction(&self, id: RrNodeId) -> Direction {
        self.storage().node_direction(id)
    }

    /// Capacity.
    pub fn node_capacity(&self, id: RrNodeId) -> u16 {
        self.storage().node_capacity(id)
    }

    /// Opaque cost index.
    pub fn node_cost_index(&self, id: RrNodeId) -> u16 {
        self.storage().node_cost_index(id)
    }

    /// Pin sides.
    pub fn node_sides(&self, id: RrNodeId) -> SideSet {
        self.storage().node_sides(id)
    }

    /// Returns `true` if the pin sits on `side`.
    pub fn is_node_on_specific_side(&self, id: RrNodeId, side: Side) -> bool {
        self.storage().is_node_on_specific_side(id, side)
    }

    /// Outgoing edges of a node, as a contiguous range.
    pub fn edges_of(&self, id: RrNodeId) -> EdgeRange {
        self.storage().edge_range(id)
    }

    /// Number of outgoing edges.
    pub fn num_edges(&self, id: RrNodeId) -> usize {
        self.edges_of(id).len()
    }

    /// Number of incoming edges.
    pub fn fan_in(&self, id: RrNodeId) -> u32 {
        self.storage().fan_in_count(id)
    }

    /// Source node of an edge.
    pub fn edge_src_node(&self, edge: RrEdgeId) -> RrNodeId {
        self.storage().edge_src_node(edge)
    }

    /// Sink node of an edge.
    pub fn edge_sink_node(&self, edge: RrEdgeId) -> RrNodeId {
        self.storage().edge_sink_node(edge)
    }

    /// Switch of an edge.
    pub fn edge_switch(&self, edge: RrEdgeId) -> SwitchId {
        self.storage().edge_switch(edge)
    }

    /// Returns `true` if the edge can be turned off.
    pub fn edge_is_configurable(&self, edge: RrEdgeId) -> bool {
        self.storage().edge_is_configurable(edge)
    }

    /// The switch table.
    pub fn switches(&self) -> &'a [RrSwitch] {
        self.graph.switches()
    }

    /// A switch, if it exists.
    pub fn switch(&self, id: SwitchId) -> Option<&'a RrSwitch> {
        self.graph.switches().get(id.index())
    }

    /// The spatial lookup.
    pub fn spatial_lookup(&self) -> &'a SpatialLookup {
        self.graph.lookup()
    }

    /// Node at a location.
    pub fn lookup(&self, loc: Location) -> Option<RrNodeId> {
        self.graph.lookup().lookup(loc)
    }

    /// Every node of `kind` at a cell, in ptc order.
    pub fn find_channel_nodes(&self, layer: u8, x: u16, y: u16, kind: RrType) -> Vec<RrNodeId> {
        self.graph.lookup().find_channel_nodes(layer, x, y, kind)
    }

    /// Metadata entries of a node.
    pub fn node_metadata(&self, id: RrNodeId) -> &'a [MetadataEntry] {
        self.graph.node_metadata().get(id)
    }

    /// Metadata entries of the edges `src -> sink` through `switch`.
    pub fn edge_metadata(&self, src: RrNodeId, sink: RrNodeId, switch: SwitchId) -> &'a [MetadataEntry] {
        self.graph.edge_metadata().get(EdgeKey::new(src, sink, switch))
    }
}

/// An owned, validated graph with partitioned edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RrGraph {
    builder: RrGraphBuilder,
}

impl RrGraph {
    /// Freezes a builder after checking that its edges are partitioned and
    /// that [`RrGraphBuilder::validate`] passes.
    pub fn from_builder(builder: RrGraphBuilder) -> RrGraphResult<Self> {
        if !builder.storage().is_partitioned() {
            return Err(RrGraphError::NotFinalized { operation: "freeze" });
        }
        builder.validate()?;
        Ok(Self { builder })
    }

    /// Read-only view.
    pub fn view(&self) -> RrGraphView<'_> {
        RrGraphView::new(&self.builder)
    }

    /// Returns to construction, for rebuilds and further passes.
    pub fn into_builder(self) -> RrGraphBuilder {
        self.builder
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.builder.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.builder.edge_count()
    }

    /// The switch table.
    pub fn switches(&self) -> &[RrSwitch] {
        self.builder.switches()
    }

    /// See [`RrGraphBuilder::fingerprint`].
    pub fn fingerprint(&self) -> RrGraphResult<ContentHash> {
        self.builder.fingerprint()
    }
}

impl TryFrom<RrGraphBuilder> for RrGraph {
    type Error = RrGraphError;

    fn try_from(builder: RrGraphBuilder) -> RrGraphResult<Self> {
        Self::from_builder(builder)
    }
}
