//! The mutable interface to a routing-resource graph under construction.
//!
//! [`RrGraphBuilder`] owns the node/edge storage, the spatial lookup, both
//! metadata stores and the switch table, and keeps them consistent: every
//! attribute change that moves a node in the lookup re-derives its entries
//! from the attributes as they are at that moment.

use crate::error::{RrGraphError, RrGraphResult};
use crate::ids::{RrEdgeId, RrNodeId};
use crate::interposer::{self, InterposerReport};
use crate::lookup::{Location, SpatialLookup};
use crate::metadata::{EdgeKey, EdgeMetadata, NodeMetadata};
use crate::permutation::NodePermutation;
use crate::reorder;
use crate::storage::{GraphState, NodeStorage};
use crate::types::{Direction, NodeRect, NodeSpec, RrSwitch, RrType, Side};
use crate::view::{RrGraph, RrGraphView};
use rayon::prelude::*;
use rrg_arch::{lcm_of_block_heights, ArchDescription, DeviceGrid, SwitchId};
use rrg_common::ContentHash;
use rrg_config::{GraphOptions, InterposerOptions, ReorderAlgorithm};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

/// Lookup locations a node occupies according to its current attributes.
///
/// Nodes without a kind, and pins without a side, occupy nothing.
pub(crate) fn node_locations(storage: &NodeStorage, id: RrNodeId) -> Vec<Location> {
    let Some(kind) = storage.node_type(id) else {
        return Vec::new();
    };
    let layer = storage.node_layer(id);
    let ptc = storage.node_ptc_num(id);
    let sides = storage.node_sides(id);
    let mut locations = Vec::new();
    for (x, y) in storage.node_rect(id).cells() {
        let base = Location::new(layer, x, y, kind, ptc);
        if kind.is_pin() {
            locations.extend(sides.iter().map(|side| base.on_side(side)));
        } else {
            locations.push(base);
        }
    }
    locations
}

/// Like [`node_locations`], but rejects nodes that cannot be indexed.
fn indexable_locations(storage: &NodeStorage, id: RrNodeId) -> RrGraphResult<Vec<Location>> {
    let kind = storage.kind_of(id)?;
    if kind.is_pin() && storage.node_sides(id).is_empty() {
        return Err(RrGraphError::InvalidAttribute {
            node: id,
            attribute: "side",
            reason: format!("{kind} node needs a side before it can be indexed"),
        });
    }
    Ok(node_locations(storage, id))
}

fn node_occupies(storage: &NodeStorage, id: RrNodeId, loc: &Location) -> bool {
    if id.index() >= storage.len() || storage.node_type(id) != Some(loc.kind) {
        return false;
    }
    let rect = storage.node_rect(id);
    let side_ok = match (loc.kind.is_pin(), loc.side) {
        (true, Some(side)) => storage.is_node_on_specific_side(id, side),
        (true, None) => false,
        (false, _) => true,
    };
    side_ok
        && storage.node_layer(id) == loc.layer
        && storage.node_ptc_num(id) == loc.ptc
        && (rect.xlow..=rect.xhigh).contains(&loc.x)
        && (rect.ylow..=rect.yhigh).contains(&loc.y)
}

fn encode<T: Serialize>(value: &T) -> RrGraphResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| RrGraphError::Encoding(e.to_string()))
}

/// Owner of every mutable graph structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RrGraphBuilder {
    storage: NodeStorage,
    lookup: SpatialLookup,
    node_metadata: NodeMetadata,
    edge_metadata: EdgeMetadata,
    switches: Vec<RrSwitch>,
    /// Switches past this index were derived by graph passes.
    arch_switch_count: usize,
    chan_width: u16,
    /// Row alignment for derived cuts (LCM of tile heights).
    cut_alignment: u32,
}

impl RrGraphBuilder {
    /// Creates an empty graph for an architecture.
    ///
    /// The switch table is initialized from the architecture's switches.
    pub fn new(arch: &ArchDescription) -> RrGraphResult<Self> {
        let grid = DeviceGrid::new(arch.grid.width, arch.grid.height, arch.grid.layers)?;
        let cut_alignment = lcm_of_block_heights(arch.block_heights())?;
        let switches: Vec<RrSwitch> = arch.switches.iter().map(RrSwitch::from).collect();
        Ok(Self {
            storage: NodeStorage::new(grid),
            lookup: SpatialLookup::new(grid),
            node_metadata: NodeMetadata::new(),
            edge_metadata: EdgeMetadata::new(),
            arch_switch_count: switches.len(),
            switches,
            chan_width: arch.chan_width,
            cut_alignment,
        })
    }

    // --- read access ---

    /// The device grid.
    pub fn grid(&self) -> DeviceGrid {
        self.storage.grid()
    }

    /// Tracks per routing channel.
    pub fn chan_width(&self) -> u16 {
        self.chan_width
    }

    /// Row alignment that derived cuts snap to.
    pub fn cut_alignment(&self) -> u32 {
        self.cut_alignment
    }

    /// Node and edge storage.
    pub fn storage(&self) -> &NodeStorage {
        &self.storage
    }

    /// The spatial lookup.
    pub fn lookup(&self) -> &SpatialLookup {
        &self.lookup
    }

    /// Node metadata.
    pub fn node_metadata(&self) -> &NodeMetadata {
        &self.node_metadata
    }

    /// Edge metadata.
    pub fn edge_metadata(&self) -> &EdgeMetadata {
        &self.edge_metadata
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.storage.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.storage.edge_count()
    }

    /// Lifecycle state of the edge arrays.
    pub fn state(&self) -> GraphState {
        self.storage.state()
    }

    /// The switch table.
    pub fn switches(&self) -> &[RrSwitch] {
        &self.switches
    }

    /// The switch with the given id.
    pub fn switch(&self, id: SwitchId) -> RrGraphResult<&RrSwitch> {
        self.switches
            .get(id.index())
            .ok_or(RrGraphError::UnknownSwitch {
                switch: id,
                len: self.switches.len(),
            })
    }

    /// Appends a switch to the table.
    pub fn add_switch(&mut self, switch: RrSwitch) -> SwitchId {
        self.switches.push(switch);
        SwitchId::from_raw((self.switches.len() - 1) as u32)
    }

    // --- nodes ---

    /// Sets the node count to exactly `n`. See [`NodeStorage::resize`].
    pub fn resize_nodes(&mut self, n: usize) -> RrGraphResult<()> {
        if n < self.storage.len()
            && (!self.lookup.references_within(n)
                || !self.node_metadata.references_within(n)
                || !self.edge_metadata.references_within(n))
        {
            return Err(RrGraphError::LookupInconsistency {
                reason: format!(
                    "cannot shrink to {n} nodes: dropped nodes are indexed or carry metadata"
                ),
            });
        }
        self.storage.resize(n)
    }

    /// Reserves space for `additional` more nodes.
    pub fn reserve_nodes(&mut self, additional: usize) {
        self.storage.reserve(additional);
    }

    /// Creates a node with every attribute of `spec` and indexes it.
    ///
    /// On error the new slot is removed again and nothing else changes.
    pub fn create_node(&mut self, spec: &NodeSpec) -> RrGraphResult<RrNodeId> {
        let id = RrNodeId::from_raw(self.storage.len() as u32);
        self.storage.resize(id.index() + 1)?;
        if let Err(err) = self.apply_spec(id, spec) {
            self.storage.resize(id.index())?;
            return Err(err);
        }
        Ok(id)
    }

    fn apply_spec(&mut self, id: RrNodeId, spec: &NodeSpec) -> RrGraphResult<()> {
        let storage = &mut self.storage;
        storage.set_node_type(id, spec.kind)?;
        storage.set_node_layer(id, spec.layer)?;
        storage.set_node_coordinates(id, spec.rect)?;
        storage.set_node_ptc_num(id, spec.ptc)?;
        storage.set_node_direction(id, spec.direction)?;
        storage.set_node_capacity(id, spec.capacity)?;
        storage.set_node_cost_index(id, spec.cost_index)?;
        for side in spec.sides.iter() {
            storage.add_node_side(id, side)?;
        }
        self.add_node_to_all_locs(id)
    }

    /// Applies an attribute change to a node, moving its lookup entries.
    ///
    /// Entries are removed using the attributes before the change and
    /// re-added using the attributes after it. Nodes that were not indexed
    /// stay unindexed. If the change is rejected, or the new locations
    /// cannot be indexed, the old attributes and entries are put back.
    fn update_located(
        &mut self,
        id: RrNodeId,
        update: impl FnOnce(&mut NodeStorage) -> RrGraphResult<()>,
    ) -> RrGraphResult<()> {
        self.storage.check_node(id)?;
        let before = self.storage.snapshot_node(id);
        let removed = self.remove_node_from_all_locs(id)?;
        let result = update(&mut self.storage).and_then(|()| {
            if removed > 0 {
                self.add_node_to_all_locs(id)
            } else {
                Ok(())
            }
        });
        if let Err(err) = result {
            self.storage.restore_node(id, before);
            if removed > 0 {
                // the old locations were freed above and nothing took them
                self.add_node_to_all_locs(id)?;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Sets the node kind.
    pub fn set_node_type(&mut self, id: RrNodeId, kind: RrType) -> RrGraphResult<()> {
        self.update_located(id, |s| s.set_node_type(id, kind))
    }

    /// Sets the die layer.
    pub fn set_node_layer(&mut self, id: RrNodeId, layer: u8) -> RrGraphResult<()> {
        self.update_located(id, |s| s.set_node_layer(id, layer))
    }

    /// Sets the occupied rectangle. Same as [`relocate_node`](Self::relocate_node).
    pub fn set_node_coordinates(&mut self, id: RrNodeId, rect: NodeRect) -> RrGraphResult<()> {
        self.relocate_node(id, rect)
    }

    /// Sets the raw ptc number.
    pub fn set_node_ptc_num(&mut self, id: RrNodeId, ptc: u16) -> RrGraphResult<()> {
        self.update_located(id, |s| s.set_node_ptc_num(id, ptc))
    }

    /// Sets the track number of a wire.
    pub fn set_node_track_num(&mut self, id: RrNodeId, track: u16) -> RrGraphResult<()> {
        self.update_located(id, |s| s.set_node_track_num(id, track))
    }

    /// Sets the pin number of an OPIN or IPIN.
    pub fn set_node_pin_num(&mut self, id: RrNodeId, pin: u16) -> RrGraphResult<()> {
        self.update_located(id, |s| s.set_node_pin_num(id, pin))
    }

    /// Sets the class number of a SOURCE or SINK.
    pub fn set_node_class_num(&mut self, id: RrNodeId, class: u16) -> RrGraphResult<()> {
        self.update_located(id, |s| s.set_node_class_num(id, class))
    }

    /// Adds a side to a pin.
    pub fn add_node_side(&mut self, id: RrNodeId, side: Side) -> RrGraphResult<()> {
        self.update_located(id, |s| s.add_node_side(id, side))
    }

    /// Sets the signal direction of a wire.
    pub fn set_node_direction(&mut self, id: RrNodeId, direction: Direction) -> RrGraphResult<()> {
        self.storage.set_node_direction(id, direction)
    }

    /// Sets the capacity.
    pub fn set_node_capacity(&mut self, id: RrNodeId, capacity: u16) -> RrGraphResult<()> {
        self.storage.set_node_capacity(id, capacity)
    }

    /// Sets the opaque cost index.
    pub fn set_node_cost_index(&mut self, id: RrNodeId, cost_index: u16) -> RrGraphResult<()> {
        self.storage.set_node_cost_index(id, cost_index)
    }

    // --- spatial lookup ---

    /// Registers a node at every location its current attributes cover.
    ///
    /// Nothing is written unless every location is free or already holds
    /// this node.
    pub fn add_node_to_all_locs(&mut self, id: RrNodeId) -> RrGraphResult<()> {
        let locations = indexable_locations(&self.storage, id)?;
        for loc in &locations {
            match self.lookup.lookup(*loc) {
                Some(other) if other != id => {
                    return Err(RrGraphError::LookupInconsistency {
                        reason: format!("{loc} already holds node {other}, cannot add node {id}"),
                    })
                }
                _ => {}
            }
        }
        for loc in locations {
            self.lookup.add(id, loc)?;
        }
        Ok(())
    }

    /// Removes a node from every location its current attributes cover.
    /// Returns the number of entries removed.
    pub fn remove_node_from_all_locs(&mut self, id: RrNodeId) -> RrGraphResult<usize> {
        self.storage.check_node(id)?;
        let removed = node_locations(&self.storage, id)
            .into_iter()
            .filter(|loc| self.lookup.remove(id, *loc))
            .count();
        Ok(removed)
    }

    /// Moves a node to a new rectangle, keeping the lookup in step.
    ///
    /// The old entries are computed from the node's attributes at the time
    /// of the call, so a rectangle changed earlier through this builder is
    /// always removed correctly.
    pub fn relocate_node(&mut self, id: RrNodeId, rect: NodeRect) -> RrGraphResult<()> {
        self.update_located(id, |s| s.set_node_coordinates(id, rect))
    }

    /// Indexes every node.
    ///
    /// Locations are computed in parallel and inserted sequentially. A
    /// failure leaves the lookup partly filled; the build should be
    /// abandoned.
    pub fn index_all_nodes(&mut self) -> RrGraphResult<()> {
        let storage = &self.storage;
        let per_node = (0..storage.len())
            .into_par_iter()
            .map(|i| indexable_locations(storage, RrNodeId::from_raw(i as u32)))
            .collect::<RrGraphResult<Vec<_>>>()?;
        for (i, locations) in per_node.into_iter().enumerate() {
            let id = RrNodeId::from_raw(i as u32);
            for loc in locations {
                self.lookup.add(id, loc)?;
            }
        }
        debug!(nodes = self.storage.len(), entries = self.lookup.len(), "indexed all nodes");
        Ok(())
    }

    /// Checks that the lookup and node attributes agree in both directions.
    ///
    /// The lookup must cover the node grid with correctly sized tables.
    /// Every location a node occupies must resolve to that node, and every
    /// entry must point at a node occupying it. Nodes without a kind are
    /// skipped; [`validate`](Self::validate) reports them.
    pub fn verify_lookup(&self) -> RrGraphResult<()> {
        let storage = &self.storage;
        let lookup = &self.lookup;
        if lookup.grid() != storage.grid() {
            return Err(RrGraphError::LookupInconsistency {
                reason: format!(
                    "lookup covers a {:?} grid but the nodes use {:?}",
                    lookup.grid(),
                    storage.grid()
                ),
            });
        }
        lookup.check_shape()?;
        let missing = (0..storage.len()).into_par_iter().find_map_first(|i| {
            let id = RrNodeId::from_raw(i as u32);
            node_locations(storage, id)
                .into_iter()
                .find(|loc| lookup.lookup(*loc) != Some(id))
                .map(|loc| RrGraphError::LookupInconsistency {
                    reason: format!(
                        "node {id} occupies {loc} but the lookup has {:?}",
                        lookup.lookup(loc)
                    ),
                })
        });
        if let Some(err) = missing {
            return Err(err);
        }
        if let Some((loc, node)) = lookup
            .entries()
            .find(|(loc, node)| !node_occupies(storage, *node, loc))
        {
            return Err(RrGraphError::LookupInconsistency {
                reason: format!("{loc} points at node {node}, which does not occupy it"),
            });
        }
        Ok(())
    }

    // --- edges ---

    /// Appends an edge. Only allowed while building.
    pub fn emplace_edge(
        &mut self,
        src: RrNodeId,
        sink: RrNodeId,
        switch: SwitchId,
        configurable: bool,
    ) -> RrGraphResult<RrEdgeId> {
        self.switch(switch)?;
        self.storage.emplace_edge(src, sink, switch, configurable)
    }

    /// Reserves space for `additional` more edges.
    pub fn reserve_edges(&mut self, additional: usize) {
        self.storage.reserve_edges(additional);
    }

    fn edge_key(&self, edge: RrEdgeId) -> EdgeKey {
        EdgeKey::new(
            self.storage.edge_src_node(edge),
            self.storage.edge_sink_node(edge),
            self.storage.edge_switch(edge),
        )
    }

    /// Moves the source end of an edge; its metadata follows.
    pub fn set_edge_src_node(&mut self, edge: RrEdgeId, src: RrNodeId) -> RrGraphResult<()> {
        self.storage.check_edge(edge)?;
        let old = self.edge_key(edge);
        self.storage.set_edge_src_node(edge, src)?;
        self.edge_metadata.rekey(old, self.edge_key(edge));
        Ok(())
    }

    /// Moves the sink end of an edge; its metadata follows.
    pub fn set_edge_sink_node(&mut self, edge: RrEdgeId, sink: RrNodeId) -> RrGraphResult<()> {
        self.storage.check_edge(edge)?;
        let old = self.edge_key(edge);
        self.storage.set_edge_sink_node(edge, sink)?;
        self.edge_metadata.rekey(old, self.edge_key(edge));
        Ok(())
    }

    /// Groups edges by source. See [`NodeStorage::finalize`].
    pub fn finalize(&mut self) {
        self.storage.finalize();
    }

    /// Returns to the building state. See [`NodeStorage::reopen`].
    pub fn reopen(&mut self) {
        self.storage.reopen();
    }

    // --- metadata ---

    /// Attaches a `(name, value)` pair to a node.
    pub fn add_node_metadata(
        &mut self,
        id: RrNodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> RrGraphResult<()> {
        self.storage.check_node(id)?;
        self.node_metadata.add(id, name, value);
        Ok(())
    }

    /// Attaches a `(name, value)` pair to the edges `src -> sink` through `switch`.
    pub fn add_edge_metadata(
        &mut self,
        src: RrNodeId,
        sink: RrNodeId,
        switch: SwitchId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> RrGraphResult<()> {
        self.storage.check_node(src)?;
        self.storage.check_node(sink)?;
        self.switch(switch)?;
        self.edge_metadata
            .add(EdgeKey::new(src, sink, switch), name, value);
        Ok(())
    }

    pub(crate) fn copy_node_metadata(&mut self, from: RrNodeId, to: RrNodeId) {
        self.node_metadata.copy_entries(from, to);
    }

    // --- whole-graph passes ---

    /// Full consistency check: storage, metadata keys and the lookup.
    pub fn validate(&self) -> RrGraphResult<()> {
        self.storage.validate(self.switches.len())?;
        let n = self.storage.len();
        if !self.node_metadata.references_within(n) || !self.edge_metadata.references_within(n) {
            return Err(RrGraphError::LookupInconsistency {
                reason: "metadata is attached to a node outside the graph".into(),
            });
        }
        self.verify_lookup()
    }

    /// Permutes node ids for locality.
    ///
    /// Does nothing and returns `false` for [`ReorderAlgorithm::None`] or when
    /// the graph has fewer than `threshold` nodes. Otherwise needs finalized
    /// edges and returns `true` once storage, lookup and both metadata
    /// stores have been remapped.
    pub fn reorder_nodes(
        &mut self,
        algorithm: ReorderAlgorithm,
        threshold: usize,
        seed: u64,
    ) -> RrGraphResult<bool> {
        let nodes = self.storage.len();
        if algorithm == ReorderAlgorithm::None || nodes < threshold {
            debug!(?algorithm, nodes, threshold, "node reordering skipped");
            return Ok(false);
        }
        let _span = info_span!("reorder_nodes", ?algorithm, nodes).entered();
        if !self.storage.is_partitioned() {
            return Err(RrGraphError::NotFinalized {
                operation: "reorder_nodes",
            });
        }
        let perm = reorder::compute_permutation(&self.storage, algorithm, seed)?;
        self.apply_permutation(&perm)?;
        info!(nodes, identity = perm.is_identity(), "nodes reordered");
        Ok(true)
    }

    /// Applies a node permutation to storage, lookup and both metadata stores.
    ///
    /// Every precondition is checked before anything is touched; the
    /// remapping itself cannot fail. An identity permutation changes nothing.
    pub fn apply_permutation(&mut self, perm: &NodePermutation) -> RrGraphResult<()> {
        let n = self.storage.len();
        if perm.len() != n {
            return Err(RrGraphError::InvalidPermutation {
                reason: format!("permutation covers {} nodes, graph has {n}", perm.len()),
            });
        }
        if !self.storage.is_partitioned() {
            return Err(RrGraphError::NotFinalized {
                operation: "apply_permutation",
            });
        }
        if !self.lookup.references_within(n) {
            return Err(RrGraphError::LookupInconsistency {
                reason: "lookup references a node outside the graph".into(),
            });
        }
        if !self.node_metadata.references_within(n) || !self.edge_metadata.references_within(n) {
            return Err(RrGraphError::InvalidPermutation {
                reason: "metadata is attached to a node outside the graph".into(),
            });
        }
        if perm.is_identity() {
            return Ok(());
        }
        self.storage.permute(perm);
        self.lookup.remap(perm);
        self.node_metadata.remap_nodes(perm);
        self.edge_metadata.remap_nodes(perm);
        Ok(())
    }

    /// Splits vertical wires at die boundaries. See [`crate::interposer`].
    pub fn run_interposer(&mut self, options: &InterposerOptions) -> RrGraphResult<InterposerReport> {
        interposer::apply(self, options)
    }

    /// Read-only view. Requires finalized edges.
    pub fn view(&self) -> RrGraphResult<RrGraphView<'_>> {
        if !self.storage.is_partitioned() {
            return Err(RrGraphError::NotFinalized { operation: "view" });
        }
        Ok(RrGraphView::new(self))
    }

    /// Hash of the encoded storage, lookup, metadata and switch table.
    pub fn fingerprint(&self) -> RrGraphResult<ContentHash> {
        let parts = [
            encode(&self.storage)?,
            encode(&self.lookup)?,
            encode(&self.node_metadata)?,
            encode(&self.edge_metadata)?,
            encode(&self.switches)?,
        ];
        Ok(ContentHash::from_chunks(parts.iter().map(Vec::as_slice)))
    }

    /// Runs the post-construction pipeline and freezes the graph.
    ///
    /// Finalizes edges, validates, reorders and runs the interposer pass as
    /// `options` ask, then checks the result once more.
    pub fn finish(mut self, options: &GraphOptions) -> RrGraphResult<RrGraph> {
        self.finalize();
        self.validate()?;
        let reorder = &options.reorder;
        self.reorder_nodes(reorder.algorithm, reorder.threshold, reorder.seed)?;
        if options.interposer.is_enabled() {
            self.run_interposer(&options.interposer)?;
        }
        RrGraph::from_builder(self)
    }

    /// Removes every node, edge, lookup entry, metadata entry and derived
    /// switch. Architecture data is kept.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.lookup.clear();
        self.node_metadata.clear();
        self.edge_metadata.clear();
        self.switches.truncate(self.arch_switch_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SideSet;
    use rrg_arch::{ArchSwitch, SwitchKind, TileType};

    fn arch() -> ArchDescription {
        let switch = |name: &str, tdel: f32| ArchSwitch {
            name: name.into(),
            kind: SwitchKind::Mux,
            r: 100.0,
            cin: 1e-15,
            cout: 2e-15,
            cinternal: 0.0,
            tdel,
            mux_trans_size: 1.0,
            buf_size: 0.0,
        };
        ArchDescription {
            name: "test".into(),
            grid: DeviceGrid::new(10, 12, 1).unwrap(),
            chan_width: 4,
            switches: vec![switch("ipin_cblock", 1e-10), switch("L1_mux", 5e-11)],
            tile_types: vec![TileType {
                name: "clb".into(),
                width: 1,
                height: 2,
            }],
        }
    }

    fn node(raw: u32) -> RrNodeId {
        RrNodeId::from_raw(raw)
    }

    #[test]
    fn new_copies_arch_tables() {
        let b = RrGraphBuilder::new(&arch()).unwrap();
        assert_eq!(b.switches().len(), 2);
        assert_eq!(b.switch(SwitchId::from_raw(1)).unwrap().name, "L1_mux");
        assert_eq!(b.chan_width(), 4);
        assert_eq!(b.cut_alignment(), 2);
        assert!(matches!(
            b.switch(SwitchId::from_raw(2)),
            Err(RrGraphError::UnknownSwitch { .. })
        ));
    }

    #[test]
    fn create_node_indexes_every_cell() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        let id = b
            .create_node(&NodeSpec::chany(2, 1, 4, 3, Direction::Inc))
            .unwrap();
        for y in 1..=4 {
            assert_eq!(
                b.lookup().lookup(Location::new(0, 2, y, RrType::Chany, 3)),
                Some(id)
            );
        }
        assert_eq!(b.lookup().len(), 4);
        b.verify_lookup().unwrap();
    }

    #[test]
    fn create_node_rolls_back_on_error() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        b.create_node(&NodeSpec::source(0, 0, 0)).unwrap();
        let mut bad = NodeSpec::sink(1, 1, 0);
        bad.direction = Direction::Inc;
        assert!(b.create_node(&bad).is_err());
        assert_eq!(b.node_count(), 1);
        assert_eq!(b.lookup().len(), 1);

        let overlapping = NodeSpec::source(0, 0, 0);
        assert!(matches!(
            b.create_node(&overlapping),
            Err(RrGraphError::LookupInconsistency { .. })
        ));
        assert_eq!(b.node_count(), 1);
    }

    #[test]
    fn relocate_removes_stale_entries() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        let id = b
            .create_node(&NodeSpec::chany(3, 0, 10, 0, Direction::Dec))
            .unwrap();
        b.relocate_node(id, NodeRect::new(3, 4, 3, 6)).unwrap();
        let at = |y| Location::new(0, 3, y, RrType::Chany, 0);
        assert_eq!(b.lookup().lookup(at(1)), None);
        assert_eq!(b.lookup().lookup(at(5)), Some(id));
        assert_eq!(b.lookup().len(), 3);
        b.verify_lookup().unwrap();
    }

    #[test]
    fn failed_relocation_keeps_entries() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        let id = b
            .create_node(&NodeSpec::chany(3, 0, 2, 0, Direction::Dec))
            .unwrap();
        assert!(b.relocate_node(id, NodeRect::new(3, 0, 4, 2)).is_err());
        assert_eq!(b.lookup().len(), 3);
        b.verify_lookup().unwrap();
    }

    #[test]
    fn colliding_relocation_restores_node() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        let low = b
            .create_node(&NodeSpec::chany(2, 0, 3, 0, Direction::Inc))
            .unwrap();
        let high = b
            .create_node(&NodeSpec::chany(2, 6, 9, 0, Direction::Inc))
            .unwrap();
        assert!(matches!(
            b.relocate_node(low, NodeRect::new(2, 5, 2, 7)),
            Err(RrGraphError::LookupInconsistency { .. })
        ));
        assert_eq!(b.storage().node_rect(low), NodeRect::new(2, 0, 2, 3));
        let at = |y| Location::new(0, 2, y, RrType::Chany, 0);
        assert_eq!(b.lookup().lookup(at(1)), Some(low));
        assert_eq!(b.lookup().lookup(at(5)), None);
        assert_eq!(b.lookup().lookup(at(6)), Some(high));
        assert_eq!(b.lookup().len(), 8);
        b.verify_lookup().unwrap();
    }

    #[test]
    fn colliding_track_change_restores_node() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        let a = b
            .create_node(&NodeSpec::chanx(1, 0, 2, 0, Direction::Inc))
            .unwrap();
        b.create_node(&NodeSpec::chanx(1, 2, 4, 1, Direction::Inc))
            .unwrap();
        assert!(b.set_node_track_num(a, 1).is_err());
        assert_eq!(b.storage().node_ptc_num(a), 0);
        b.verify_lookup().unwrap();
    }

    #[test]
    fn retyping_to_sideless_pin_restores_node() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        let id = b.create_node(&NodeSpec::source(4, 4, 2)).unwrap();
        assert!(matches!(
            b.set_node_type(id, RrType::Opin),
            Err(RrGraphError::InvalidAttribute { attribute: "side", .. })
        ));
        assert_eq!(b.storage().node_type(id), Some(RrType::Source));
        assert_eq!(
            b.lookup().lookup(Location::new(0, 4, 4, RrType::Source, 2)),
            Some(id)
        );
        b.verify_lookup().unwrap();
    }

    #[test]
    fn track_change_moves_entries() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        let id = b
            .create_node(&NodeSpec::chanx(1, 0, 2, 0, Direction::Inc))
            .unwrap();
        b.set_node_track_num(id, 2).unwrap();
        assert_eq!(
            b.lookup().lookup(Location::new(0, 1, 1, RrType::Chanx, 0)),
            None
        );
        assert_eq!(
            b.lookup().lookup(Location::new(0, 1, 1, RrType::Chanx, 2)),
            Some(id)
        );
    }

    #[test]
    fn pin_sides_indexed() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        let sides: SideSet = [Side::Top].into_iter().collect();
        let id = b
            .create_node(&NodeSpec::pin(RrType::Ipin, 4, 4, 1, sides))
            .unwrap();
        b.add_node_side(id, Side::Left).unwrap();
        let base = Location::new(0, 4, 4, RrType::Ipin, 1);
        assert_eq!(b.lookup().lookup(base.on_side(Side::Left)), Some(id));
        assert_eq!(b.lookup().lookup(base.on_side(Side::Top)), Some(id));
        assert_eq!(b.lookup().lookup(base.on_side(Side::Right)), None);
    }

    #[test]
    fn index_all_nodes_after_manual_setup() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        b.resize_nodes(2).unwrap();
        b.set_node_type(node(0), RrType::Chanx).unwrap();
        b.set_node_coordinates(node(0), NodeRect::new(0, 3, 5, 3)).unwrap();
        b.set_node_type(node(1), RrType::Sink).unwrap();
        b.set_node_coordinates(node(1), NodeRect::cell(7, 7)).unwrap();
        assert!(b.lookup().is_empty());
        b.index_all_nodes().unwrap();
        assert_eq!(b.lookup().len(), 7);
        b.verify_lookup().unwrap();
    }

    #[test]
    fn index_all_nodes_rejects_unset_kind() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        b.resize_nodes(1).unwrap();
        assert!(matches!(
            b.index_all_nodes(),
            Err(RrGraphError::InvalidAttribute { attribute: "kind", .. })
        ));
    }

    #[test]
    fn emplace_edge_checks_switch() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        b.resize_nodes(2).unwrap();
        assert!(matches!(
            b.emplace_edge(node(0), node(1), SwitchId::from_raw(9), true),
            Err(RrGraphError::UnknownSwitch { .. })
        ));
    }

    #[test]
    fn edge_metadata_follows_moved_edge() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        b.resize_nodes(3).unwrap();
        let sw = SwitchId::from_raw(1);
        let e = b.emplace_edge(node(0), node(1), sw, true).unwrap();
        b.add_edge_metadata(node(0), node(1), sw, "fasm", "PIP0").unwrap();
        b.set_edge_sink_node(e, node(2)).unwrap();
        assert_eq!(
            b.edge_metadata()
                .get_value(EdgeKey::new(node(0), node(2), sw), "fasm"),
            Some("PIP0")
        );
        assert!(!b.edge_metadata().contains_key(EdgeKey::new(node(0), node(1), sw)));
    }

    #[test]
    fn view_requires_finalize() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        assert!(matches!(b.view(), Err(RrGraphError::NotFinalized { .. })));
        b.finalize();
        assert!(b.view().is_ok());
    }

    #[test]
    fn reorder_below_threshold_is_noop() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        for track in 0..3 {
            b.create_node(&NodeSpec::chanx(2, 0, 3, track, Direction::Inc))
                .unwrap();
        }
        b.emplace_edge(node(2), node(0), SwitchId::from_raw(1), true)
            .unwrap();
        b.finalize();
        let before = b.fingerprint().unwrap();
        assert!(!b
            .reorder_nodes(ReorderAlgorithm::DegreeBfs, 10, 1)
            .unwrap());
        assert_eq!(b.fingerprint().unwrap(), before);
    }

    #[test]
    fn reorder_requires_finalize() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        b.create_node(&NodeSpec::source(0, 0, 0)).unwrap();
        assert!(matches!(
            b.reorder_nodes(ReorderAlgorithm::DegreeBfs, 0, 1),
            Err(RrGraphError::NotFinalized { .. })
        ));
    }

    #[test]
    fn permutation_size_checked() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        b.create_node(&NodeSpec::source(0, 0, 0)).unwrap();
        b.finalize();
        let before = b.clone();
        assert!(matches!(
            b.apply_permutation(&NodePermutation::identity(3)),
            Err(RrGraphError::InvalidPermutation { .. })
        ));
        assert_eq!(b, before);
    }

    #[test]
    fn clear_drops_derived_switches() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        let derived = b.switch(SwitchId::from_raw(1)).unwrap().scaled(2.0);
        b.add_switch(derived);
        b.create_node(&NodeSpec::source(0, 0, 0)).unwrap();
        b.clear();
        assert_eq!(b.switches().len(), 2);
        assert_eq!(b.node_count(), 0);
        assert!(b.lookup().is_empty());
    }

    #[test]
    fn validate_catches_unindexed_node() {
        let mut b = RrGraphBuilder::new(&arch()).unwrap();
        b.resize_nodes(1).unwrap();
        b.set_node_type(node(0), RrType::Source).unwrap();
        b.finalize();
        assert!(matches!(
            b.validate(),
            Err(RrGraphError::LookupInconsistency { .. })
        ));
    }
}
