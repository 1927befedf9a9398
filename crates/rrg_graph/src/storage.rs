//! Dense node and edge storage.
//!
//! Node attributes live in one array indexed by [`RrNodeId`], with the ptc
//! number in a parallel array since it is read far more often than the rest.
//! Edges are kept as parallel columns (source, sink, switch, configurable).
//!
//! While [`GraphState::Building`], edges are appended in any order and edge
//! handles are stable. [`NodeStorage::finalize`] groups them by source so that
//! [`NodeStorage::edges_of`] is a contiguous range; this renumbers edges.
//! Topology mutators are rejected once the edges are partitioned until
//! [`NodeStorage::reopen`] is called.
//!
//! Attribute getters index directly and panic on an out-of-range handle, like
//! slice indexing. Setters return [`RrGraphError::UnknownNode`] instead.

use crate::error::{RrGraphError, RrGraphResult};
use crate::ids::{EdgeRange, RrEdgeId, RrNodeId};
use crate::permutation::NodePermutation;
use crate::types::{Direction, NodeRect, RrType, Side, SideSet};
use rayon::prelude::*;
use rrg_arch::{DeviceGrid, SwitchId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the edge arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphState {
    /// Edges may be appended; per-node edge ranges are unavailable.
    Building,
    /// Edges are grouped by source.
    Finalized,
    /// Edges are grouped by source and node ids have been permuted.
    Remapped,
}

impl fmt::Display for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GraphState::Building => "building",
            GraphState::Finalized => "finalized",
            GraphState::Remapped => "remapped",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct NodeData {
    kind: Option<RrType>,
    layer: u8,
    rect: NodeRect,
    direction: Direction,
    capacity: u16,
    cost_index: u16,
    sides: SideSet,
}

/// Saved attributes of one node. See [`NodeStorage::restore_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeSnapshot {
    data: NodeData,
    ptc: u16,
}

/// Node and edge arrays of a routing-resource graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStorage {
    grid: DeviceGrid,
    nodes: Vec<NodeData>,
    node_ptc: Vec<u16>,
    /// `first_edge[n]..first_edge[n + 1]` are the edges of node `n`.
    /// Empty while building.
    first_edge: Vec<u32>,
    /// Empty while building.
    fan_in: Vec<u32>,
    edge_src: Vec<RrNodeId>,
    edge_sink: Vec<RrNodeId>,
    edge_switch: Vec<SwitchId>,
    edge_configurable: Vec<bool>,
    state: GraphState,
}

impl NodeStorage {
    /// Creates empty storage for a device grid.
    pub fn new(grid: DeviceGrid) -> Self {
        Self {
            grid,
            nodes: Vec::new(),
            node_ptc: Vec::new(),
            first_edge: Vec::new(),
            fan_in: Vec::new(),
            edge_src: Vec::new(),
            edge_sink: Vec::new(),
            edge_switch: Vec::new(),
            edge_configurable: Vec::new(),
            state: GraphState::Building,
        }
    }

    /// The device grid coordinates are checked against.
    pub fn grid(&self) -> DeviceGrid {
        self.grid
    }

    /// Current lifecycle state.
    pub fn state(&self) -> GraphState {
        self.state
    }

    /// Returns `true` if edges are grouped by source.
    pub fn is_partitioned(&self) -> bool {
        self.state != GraphState::Building
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edge_src.len()
    }

    /// Iterates every node handle in id order.
    pub fn node_ids(&self) -> impl Iterator<Item = RrNodeId> {
        (0..self.nodes.len() as u32).map(RrNodeId::from_raw)
    }

    /// Iterates every edge handle in id order.
    pub fn edge_ids(&self) -> impl Iterator<Item = RrEdgeId> {
        (0..self.edge_src.len() as u32).map(RrEdgeId::from_raw)
    }

    fn ensure_building(&self, operation: &'static str) -> RrGraphResult<()> {
        if self.is_partitioned() {
            return Err(RrGraphError::FinalizedStateViolation {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn ensure_partitioned(&self, operation: &'static str) -> RrGraphResult<()> {
        if !self.is_partitioned() {
            return Err(RrGraphError::NotFinalized { operation });
        }
        Ok(())
    }

    /// Fails with [`RrGraphError::UnknownNode`] if `id` is outside the storage.
    pub fn check_node(&self, id: RrNodeId) -> RrGraphResult<()> {
        if id.index() >= self.nodes.len() {
            return Err(RrGraphError::UnknownNode {
                node: id,
                len: self.nodes.len(),
            });
        }
        Ok(())
    }

    /// Fails with [`RrGraphError::UnknownEdge`] if `id` is outside the storage.
    pub fn check_edge(&self, id: RrEdgeId) -> RrGraphResult<()> {
        if id.index() >= self.edge_src.len() {
            return Err(RrGraphError::UnknownEdge {
                edge: id,
                len: self.edge_src.len(),
            });
        }
        Ok(())
    }

    /// Copies every attribute of a node. Panics if `id` is out of range.
    pub(crate) fn snapshot_node(&self, id: RrNodeId) -> NodeSnapshot {
        NodeSnapshot {
            data: self.nodes[id.index()],
            ptc: self.node_ptc[id.index()],
        }
    }

    /// Puts back attributes taken by [`snapshot_node`](Self::snapshot_node).
    pub(crate) fn restore_node(&mut self, id: RrNodeId, snapshot: NodeSnapshot) {
        self.nodes[id.index()] = snapshot.data;
        self.node_ptc[id.index()] = snapshot.ptc;
    }

    fn data_mut(&mut self, id: RrNodeId) -> RrGraphResult<&mut NodeData> {
        self.check_node(id)?;
        Ok(&mut self.nodes[id.index()])
    }

    /// The node's kind, or [`RrGraphError::InvalidAttribute`] if it was never set.
    pub fn kind_of(&self, id: RrNodeId) -> RrGraphResult<RrType> {
        self.check_node(id)?;
        self.nodes[id.index()]
            .kind
            .ok_or_else(|| RrGraphError::InvalidAttribute {
                node: id,
                attribute: "kind",
                reason: "node kind must be set first".into(),
            })
    }

    fn require_kind(
        &self,
        id: RrNodeId,
        attribute: &'static str,
        accepts: fn(RrType) -> bool,
    ) -> RrGraphResult<()> {
        let kind = self.kind_of(id)?;
        if !accepts(kind) {
            return Err(RrGraphError::InvalidAttribute {
                node: id,
                attribute,
                reason: format!("not applicable to {kind} nodes"),
            });
        }
        Ok(())
    }

    // --- lifecycle ---

    /// Sets the node count to exactly `n`, filling new slots with defaults.
    ///
    /// Shrinking is allowed only if no edge references a dropped node.
    pub fn resize(&mut self, n: usize) -> RrGraphResult<()> {
        self.ensure_building("resize")?;
        if n < self.nodes.len() {
            if let Some(&node) = self
                .edge_src
                .iter()
                .chain(&self.edge_sink)
                .find(|id| id.index() >= n)
            {
                return Err(RrGraphError::UnknownNode { node, len: n });
            }
        }
        self.nodes.resize(n, NodeData::default());
        self.node_ptc.resize(n, 0);
        Ok(())
    }

    /// Reserves space for at least `additional` more nodes.
    pub fn reserve(&mut self, additional: usize) {
        self.nodes.reserve(additional);
        self.node_ptc.reserve(additional);
    }

    /// Reserves space for at least `additional` more edges.
    pub fn reserve_edges(&mut self, additional: usize) {
        self.edge_src.reserve(additional);
        self.edge_sink.reserve(additional);
        self.edge_switch.reserve(additional);
        self.edge_configurable.reserve(additional);
    }

    /// Removes every node and edge and returns to the building state.
    pub fn clear(&mut self) {
        *self = Self::new(self.grid);
    }

    // --- node setters ---

    fn check_geometry(&self, id: RrNodeId, kind: RrType, rect: NodeRect) -> RrGraphResult<()> {
        if !self.grid.contains(rect.xlow, rect.ylow) || !self.grid.contains(rect.xhigh, rect.yhigh)
        {
            return Err(RrGraphError::OutOfBoundsGeometry {
                node: id,
                reason: format!(
                    "({},{})-({},{}) exceeds the {}x{} grid",
                    rect.xlow, rect.ylow, rect.xhigh, rect.yhigh, self.grid.width, self.grid.height
                ),
            });
        }
        let shape_error = |reason: String| RrGraphError::InvalidAttribute {
            node: id,
            attribute: "coordinates",
            reason,
        };
        if rect.xlow > rect.xhigh || rect.ylow > rect.yhigh {
            return Err(shape_error(format!(
                "inverted rectangle ({},{})-({},{})",
                rect.xlow, rect.ylow, rect.xhigh, rect.yhigh
            )));
        }
        match kind {
            RrType::Chanx if rect.ylow != rect.yhigh => {
                Err(shape_error("CHANX nodes span a single row".into()))
            }
            RrType::Chany if rect.xlow != rect.xhigh => {
                Err(shape_error("CHANY nodes span a single column".into()))
            }
            kind if !kind.is_wire() && !rect.is_single_cell() => {
                Err(shape_error(format!("{kind} nodes occupy a single cell")))
            }
            _ => Ok(()),
        }
    }

    /// Sets the node kind.
    ///
    /// Attributes meaningless for the new kind (direction, sides) are reset.
    /// The current rectangle must be valid for the new kind.
    pub fn set_node_type(&mut self, id: RrNodeId, kind: RrType) -> RrGraphResult<()> {
        self.check_node(id)?;
        self.check_geometry(id, kind, self.nodes[id.index()].rect)?;
        let node = &mut self.nodes[id.index()];
        node.kind = Some(kind);
        if !kind.is_wire() {
            node.direction = Direction::None;
        }
        if !kind.is_pin() {
            node.sides = SideSet::empty();
        }
        Ok(())
    }

    /// Sets the die layer.
    pub fn set_node_layer(&mut self, id: RrNodeId, layer: u8) -> RrGraphResult<()> {
        let grid = self.grid;
        let node = self.data_mut(id)?;
        if !grid.contains_layer(layer) {
            return Err(RrGraphError::OutOfBoundsGeometry {
                node: id,
                reason: format!("layer {layer} but the device has {} layers", grid.layers),
            });
        }
        node.layer = layer;
        Ok(())
    }

    /// Sets the occupied rectangle. The kind must be set first.
    pub fn set_node_coordinates(&mut self, id: RrNodeId, rect: NodeRect) -> RrGraphResult<()> {
        let kind = self.kind_of(id)?;
        self.check_geometry(id, kind, rect)?;
        self.nodes[id.index()].rect = rect;
        Ok(())
    }

    /// Sets the raw ptc number regardless of kind.
    pub fn set_node_ptc_num(&mut self, id: RrNodeId, ptc: u16) -> RrGraphResult<()> {
        self.check_node(id)?;
        self.node_ptc[id.index()] = ptc;
        Ok(())
    }

    /// Sets the track number of a wire.
    pub fn set_node_track_num(&mut self, id: RrNodeId, track: u16) -> RrGraphResult<()> {
        self.require_kind(id, "track number", RrType::is_wire)?;
        self.node_ptc[id.index()] = track;
        Ok(())
    }

    /// Sets the pin number of an OPIN or IPIN.
    pub fn set_node_pin_num(&mut self, id: RrNodeId, pin: u16) -> RrGraphResult<()> {
        self.require_kind(id, "pin number", RrType::is_pin)?;
        self.node_ptc[id.index()] = pin;
        Ok(())
    }

    /// Sets the class number of a SOURCE or SINK.
    pub fn set_node_class_num(&mut self, id: RrNodeId, class: u16) -> RrGraphResult<()> {
        self.require_kind(id, "class number", RrType::is_class)?;
        self.node_ptc[id.index()] = class;
        Ok(())
    }

    /// Sets the signal direction. Only wires accept INC or DEC.
    pub fn set_node_direction(&mut self, id: RrNodeId, direction: Direction) -> RrGraphResult<()> {
        if direction != Direction::None {
            self.require_kind(id, "direction", RrType::is_wire)?;
        }
        self.data_mut(id)?.direction = direction;
        Ok(())
    }

    /// Sets the capacity.
    pub fn set_node_capacity(&mut self, id: RrNodeId, capacity: u16) -> RrGraphResult<()> {
        self.data_mut(id)?.capacity = capacity;
        Ok(())
    }

    /// Sets the opaque cost index.
    pub fn set_node_cost_index(&mut self, id: RrNodeId, cost_index: u16) -> RrGraphResult<()> {
        self.data_mut(id)?.cost_index = cost_index;
        Ok(())
    }

    /// Adds a side to a pin.
    pub fn add_node_side(&mut self, id: RrNodeId, side: Side) -> RrGraphResult<()> {
        self.require_kind(id, "side", RrType::is_pin)?;
        self.nodes[id.index()].sides.insert(side);
        Ok(())
    }

    // --- node getters ---

    /// The node kind, `None` if never set.
    pub fn node_type(&self, id: RrNodeId) -> Option<RrType> {
        self.nodes[id.index()].kind
    }

    /// The die layer.
    pub fn node_layer(&self, id: RrNodeId) -> u8 {
        self.nodes[id.index()].layer
    }

    /// The occupied rectangle.
    pub fn node_rect(&self, id: RrNodeId) -> NodeRect {
        self.nodes[id.index()].rect
    }

    /// Lowest column.
    pub fn node_xlow(&self, id: RrNodeId) -> u16 {
        self.nodes[id.index()].rect.xlow
    }

    /// Lowest row.
    pub fn node_ylow(&self, id: RrNodeId) -> u16 {
        self.nodes[id.index()].rect.ylow
    }

    /// Highest column.
    pub fn node_xhigh(&self, id: RrNodeId) -> u16 {
        self.nodes[id.index()].rect.xhigh
    }

    /// Highest row.
    pub fn node_yhigh(&self, id: RrNodeId) -> u16 {
        self.nodes[id.index()].rect.yhigh
    }

    /// The raw ptc number.
    pub fn node_ptc_num(&self, id: RrNodeId) -> u16 {
        self.node_ptc[id.index()]
    }

    /// The track number of a wire.
    pub fn node_track_num(&self, id: RrNodeId) -> RrGraphResult<u16> {
        self.require_kind(id, "track number", RrType::is_wire)?;
        Ok(self.node_ptc[id.index()])
    }

    /// The pin number of an OPIN or IPIN.
    pub fn node_pin_num(&self, id: RrNodeId) -> RrGraphResult<u16> {
        self.require_kind(id, "pin number", RrType::is_pin)?;
        Ok(self.node_ptc[id.index()])
    }

    /// The class number of a SOURCE or SINK.
    pub fn node_class_num(&self, id: RrNodeId) -> RrGraphResult<u16> {
        self.require_kind(id, "class number", RrType::is_class)?;
        Ok(self.node_ptc[id.index()])
    }

    /// Signal direction; [`Direction::None`] for non-wires.
    pub fn node_direction(&self, id: RrNodeId) -> Direction {
        self.nodes[id.index()].direction
    }

    /// Capacity.
    pub fn node_capacity(&self, id: RrNodeId) -> u16 {
        self.nodes[id.index()].capacity
    }

    /// Opaque cost index.
    pub fn node_cost_index(&self, id: RrNodeId) -> u16 {
        self.nodes[id.index()].cost_index
    }

    /// The pin sides; empty for non-pins.
    pub fn node_sides(&self, id: RrNodeId) -> SideSet {
        self.nodes[id.index()].sides
    }

    /// Returns `true` if the pin sits on `side`.
    pub fn is_node_on_specific_side(&self, id: RrNodeId, side: Side) -> bool {
        self.nodes[id.index()].sides.contains(side)
    }

    // --- edges ---

    /// Appends an edge. O(1); only allowed while building.
    pub fn emplace_edge(
        &mut self,
        src: RrNodeId,
        sink: RrNodeId,
        switch: SwitchId,
        configurable: bool,
    ) -> RrGraphResult<RrEdgeId> {
        self.ensure_building("emplace_edge")?;
        self.check_node(src)?;
        self.check_node(sink)?;
        let id = RrEdgeId::from_raw(self.edge_src.len() as u32);
        self.edge_src.push(src);
        self.edge_sink.push(sink);
        self.edge_switch.push(switch);
        self.edge_configurable.push(configurable);
        Ok(id)
    }

    /// Groups edges by source and computes per-node ranges and fan-in.
    ///
    /// The grouping is stable: edges of one source keep their relative order.
    /// Calling this on partitioned storage is a no-op.
    pub fn finalize(&mut self) {
        if self.is_partitioned() {
            return;
        }
        self.partition_edges();
        self.state = GraphState::Finalized;
    }

    /// Returns to the building state. Edge order is kept, so handles taken
    /// after the last finalize stay valid until the next one.
    pub fn reopen(&mut self) {
        if !self.is_partitioned() {
            return;
        }
        self.state = GraphState::Building;
        self.first_edge.clear();
        self.fan_in.clear();
    }

    /// Counting sort of the edge columns by source.
    fn partition_edges(&mut self) {
        let n = self.nodes.len();
        let mut first = vec![0u32; n + 1];
        for src in &self.edge_src {
            first[src.index() + 1] += 1;
        }
        for i in 0..n {
            first[i + 1] += first[i];
        }

        let mut cursor = first.clone();
        let mut order = vec![0usize; self.edge_src.len()];
        for (edge, src) in self.edge_src.iter().enumerate() {
            let slot = &mut cursor[src.index()];
            order[*slot as usize] = edge;
            *slot += 1;
        }

        self.edge_src = order.iter().map(|&e| self.edge_src[e]).collect();
        self.edge_sink = order.iter().map(|&e| self.edge_sink[e]).collect();
        self.edge_switch = order.iter().map(|&e| self.edge_switch[e]).collect();
        self.edge_configurable = order.iter().map(|&e| self.edge_configurable[e]).collect();

        let mut fan_in = vec![0u32; n];
        for sink in &self.edge_sink {
            fan_in[sink.index()] += 1;
        }
        self.first_edge = first;
        self.fan_in = fan_in;
    }

    /// The outgoing edges of a node. Requires partitioned edges.
    pub fn edges_of(&self, id: RrNodeId) -> RrGraphResult<EdgeRange> {
        self.ensure_partitioned("edges_of")?;
        self.check_node(id)?;
        Ok(EdgeRange::new(
            self.first_edge[id.index()],
            self.first_edge[id.index() + 1],
        ))
    }

    /// Number of outgoing edges. Requires partitioned edges.
    pub fn num_edges(&self, id: RrNodeId) -> RrGraphResult<usize> {
        Ok(self.edges_of(id)?.len())
    }

    /// Number of incoming edges. Requires partitioned edges.
    pub fn fan_in(&self, id: RrNodeId) -> RrGraphResult<u32> {
        self.ensure_partitioned("fan_in")?;
        self.check_node(id)?;
        Ok(self.fan_in[id.index()])
    }

    /// Edge range of a node in partitioned storage.
    ///
    /// # Panics
    ///
    /// Panics if the edges are not partitioned or `id` is out of range.
    pub(crate) fn edge_range(&self, id: RrNodeId) -> EdgeRange {
        EdgeRange::new(self.first_edge[id.index()], self.first_edge[id.index() + 1])
    }

    /// Fan-in of a node in partitioned storage; panics like [`Self::edge_range`].
    pub(crate) fn fan_in_count(&self, id: RrNodeId) -> u32 {
        self.fan_in[id.index()]
    }

    /// Source node of an edge.
    pub fn edge_src_node(&self, edge: RrEdgeId) -> RrNodeId {
        self.edge_src[edge.index()]
    }

    /// Sink node of an edge.
    pub fn edge_sink_node(&self, edge: RrEdgeId) -> RrNodeId {
        self.edge_sink[edge.index()]
    }

    /// Switch of an edge.
    pub fn edge_switch(&self, edge: RrEdgeId) -> SwitchId {
        self.edge_switch[edge.index()]
    }

    /// Returns `true` if the edge can be turned off.
    pub fn edge_is_configurable(&self, edge: RrEdgeId) -> bool {
        self.edge_configurable[edge.index()]
    }

    /// Moves the source end of an edge. Only allowed while building.
    pub fn set_edge_src_node(&mut self, edge: RrEdgeId, src: RrNodeId) -> RrGraphResult<()> {
        self.ensure_building("set_edge_src_node")?;
        self.check_edge(edge)?;
        self.check_node(src)?;
        self.edge_src[edge.index()] = src;
        Ok(())
    }

    /// Moves the sink end of an edge. Only allowed while building.
    pub fn set_edge_sink_node(&mut self, edge: RrEdgeId, sink: RrNodeId) -> RrGraphResult<()> {
        self.ensure_building("set_edge_sink_node")?;
        self.check_edge(edge)?;
        self.check_node(sink)?;
        self.edge_sink[edge.index()] = sink;
        Ok(())
    }

    // --- whole-graph operations ---

    /// Physically permutes node arrays, remaps edge endpoints and regroups.
    ///
    /// Callers have checked that `perm` covers exactly this storage. An
    /// identity permutation changes nothing, including the state.
    pub(crate) fn permute(&mut self, perm: &NodePermutation) {
        debug_assert_eq!(perm.len(), self.nodes.len());
        if perm.is_identity() {
            return;
        }
        self.nodes = perm
            .new_to_old()
            .iter()
            .map(|old| self.nodes[old.index()])
            .collect();
        self.node_ptc = perm
            .new_to_old()
            .iter()
            .map(|old| self.node_ptc[old.index()])
            .collect();
        for id in self.edge_src.iter_mut().chain(self.edge_sink.iter_mut()) {
            *id = perm.new_id(*id);
        }
        self.partition_edges();
        self.state = GraphState::Remapped;
    }

    /// Checks every node and edge: kinds set, geometry within the grid and
    /// consistent with the kind, pins with at least one side, endpoints and
    /// switches in range, and the edge partition up to date.
    ///
    /// The error reported is the one for the lowest offending id.
    pub fn validate(&self, num_switches: usize) -> RrGraphResult<()> {
        if let Some(err) = self
            .nodes
            .par_iter()
            .enumerate()
            .find_map_first(|(i, data)| self.check_node_data(RrNodeId::from_raw(i as u32), data).err())
        {
            return Err(err);
        }

        let n = self.nodes.len();
        if let Some(err) = (0..self.edge_src.len()).into_par_iter().find_map_first(|e| {
            let edge = RrEdgeId::from_raw(e as u32);
            let (src, sink, switch) = (self.edge_src[e], self.edge_sink[e], self.edge_switch[e]);
            if src.index() >= n {
                Some(RrGraphError::UnknownNode { node: src, len: n })
            } else if sink.index() >= n {
                Some(RrGraphError::UnknownNode { node: sink, len: n })
            } else if switch.index() >= num_switches {
                Some(RrGraphError::UnknownSwitch {
                    switch,
                    len: num_switches,
                })
            } else if self.is_partitioned() && !self.edge_in_partition(edge) {
                Some(RrGraphError::PartitionMismatch { node: src })
            } else {
                None
            }
        }) {
            return Err(err);
        }

        if self.is_partitioned()
            && (self.first_edge.len() != n + 1
                || self.first_edge[n] as usize != self.edge_src.len())
        {
            return Err(RrGraphError::PartitionMismatch {
                node: RrNodeId::from_raw(n as u32),
            });
        }
        Ok(())
    }

    fn edge_in_partition(&self, edge: RrEdgeId) -> bool {
        let src = self.edge_src[edge.index()].index();
        match (self.first_edge.get(src), self.first_edge.get(src + 1)) {
            (Some(&first), Some(&end)) => first <= edge.as_raw() && edge.as_raw() < end,
            _ => false,
        }
    }

    fn check_node_data(&self, id: RrNodeId, data: &NodeData) -> RrGraphResult<()> {
        let kind = data.kind.ok_or_else(|| RrGraphError::InvalidAttribute {
            node: id,
            attribute: "kind",
            reason: "node kind was never set".into(),
        })?;
        if !self.grid.contains_layer(data.layer) {
            return Err(RrGraphError::OutOfBoundsGeometry {
                node: id,
                reason: format!("layer {} but the device has {} layers", data.layer, self.grid.layers),
            });
        }
        self.check_geometry(id, kind, data.rect)?;
        if kind.is_pin() && data.sides.is_empty() {
            return Err(RrGraphError::InvalidAttribute {
                node: id,
                attribute: "side",
                reason: format!("{kind} node has no side"),
            });
        }
        Ok(())
    }
}
