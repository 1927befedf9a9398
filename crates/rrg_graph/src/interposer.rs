//! Splitting of vertical wires at die boundaries.
//!
//! On a multi-die device the dies sit on an interposer and a vertical wire
//! cannot run across a die boundary ("cut"). Every CHANY wire with
//! `ylow <= cut < yhigh` is split into a segment on each side and a one-cell
//! crossing node at the cut, joined by edges through a slower copy of the
//! base switch.
//!
//! The pass runs in three phases:
//!
//! 1. **Discover** straddling `(wire, cut)` pairs from a read-only view, in
//!    parallel.
//! 2. **Mutate** a staged clone of the builder: split each wire along its
//!    signal direction, then move the wire's original fan-in and fan-out
//!    edges onto the segment nearest their other endpoint.
//! 3. **Validate** the staged graph and commit it over the builder.
//!
//! Any error before the commit leaves the builder untouched.

use crate::builder::RrGraphBuilder;
use crate::error::{RrGraphError, RrGraphResult};
use crate::ids::{RrEdgeId, RrNodeId};
use crate::storage::NodeStorage;
use crate::types::{Direction, NodeRect, NodeSpec, RrType, SideSet};
use crate::view::RrGraphView;
use rayon::prelude::*;
use rrg_arch::{interposer_cut_locations, SwitchId};
use rrg_config::InterposerOptions;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, warn};

/// Summary of one interposer pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterposerReport {
    /// Cut rows the pass used, ascending.
    pub cuts: Vec<u16>,
    /// Wires that crossed at least one cut.
    pub wires_split: usize,
    /// Crossing nodes created (one per wire and cut).
    pub crossing_nodes: usize,
    /// Slow switches added to the switch table.
    pub derived_switches: usize,
    /// Fan-in and fan-out edges moved onto a new segment.
    pub edges_transferred: usize,
}

/// Resolves the cut rows `options` ask for on this builder's grid.
///
/// Explicit cuts are sorted and must leave at least one row above them.
/// A cut count is turned into evenly spaced rows aligned to the tile height
/// LCM. Returns an empty list when the pass is disabled.
pub fn resolve_cuts(builder: &RrGraphBuilder, options: &InterposerOptions) -> RrGraphResult<Vec<u16>> {
    let height = builder.grid().height;
    if !options.cuts.is_empty() {
        let mut cuts = options.cuts.clone();
        cuts.sort_unstable();
        cuts.dedup();
        if let Some(&cut) = cuts
            .iter()
            .find(|&&c| u32::from(c) + 1 >= u32::from(height))
        {
            return Err(RrGraphError::InvalidCut { cut, height });
        }
        return Ok(cuts);
    }
    if options.num_cuts > 0 {
        return Ok(interposer_cut_locations(
            height,
            options.num_cuts,
            builder.cut_alignment(),
        )?);
    }
    Ok(Vec::new())
}

/// Runs the pass with the cuts `options` resolve to.
///
/// Options built in code skip the config loader, so the delay multiplier is
/// checked here as well.
pub(crate) fn apply(
    builder: &mut RrGraphBuilder,
    options: &InterposerOptions,
) -> RrGraphResult<InterposerReport> {
    let multiplier = options.delay_multiplier;
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(RrGraphError::InvalidDelayMultiplier { multiplier });
    }
    let cuts = resolve_cuts(builder, options)?;
    if cuts.is_empty() {
        return Ok(InterposerReport::default());
    }
    InterposerSession::new(options, cuts, builder.chan_width()).run(builder)
}

/// Every CHANY node straddling a cut, as `(node, cut)` in node then cut order.
fn find_crossings(view: &RrGraphView<'_>, cuts: &[u16]) -> Vec<(RrNodeId, u16)> {
    (0..view.node_count())
        .into_par_iter()
        .flat_map_iter(|i| {
            let id = RrNodeId::from_raw(i as u32);
            let is_chany = view.node_type(id) == Some(RrType::Chany);
            let rect = view.node_rect(id);
            cuts.iter()
                .filter(move |&&cut| is_chany && rect.straddles_row(cut))
                .map(move |&cut| (id, cut))
        })
        .collect()
}

/// The segment of `chain` closest in y to `other`; ties go to the earlier one.
fn nearest_segment(storage: &NodeStorage, chain: &[RrNodeId], other: NodeRect) -> RrNodeId {
    let mut best = chain[0];
    let mut best_gap = storage.node_rect(best).y_gap(&other);
    for &segment in &chain[1..] {
        let gap = storage.node_rect(segment).y_gap(&other);
        if gap < best_gap {
            best = segment;
            best_gap = gap;
        }
    }
    best
}

/// Bookkeeping for one interposer pass.
struct InterposerSession<'o> {
    options: &'o InterposerOptions,
    cuts: Vec<u16>,
    chan_width: u16,
    /// Cuts each straddling wire crosses.
    plans: BTreeMap<RrNodeId, Vec<u16>>,
    /// Base switch to its slowed-down copy.
    derived_switches: BTreeMap<SwitchId, SwitchId>,
    fanout: BTreeMap<RrNodeId, Vec<RrEdgeId>>,
    fanin: BTreeMap<RrNodeId, Vec<RrEdgeId>>,
    /// Segments of each split wire, starting with the original node and
    /// following the signal direction.
    chains: BTreeMap<RrNodeId, Vec<RrNodeId>>,
    report: InterposerReport,
}

impl<'o> InterposerSession<'o> {
    fn new(options: &'o InterposerOptions, cuts: Vec<u16>, chan_width: u16) -> Self {
        Self {
            options,
            report: InterposerReport {
                cuts: cuts.clone(),
                ..InterposerReport::default()
            },
            cuts,
            chan_width,
            plans: BTreeMap::new(),
            derived_switches: BTreeMap::new(),
            fanout: BTreeMap::new(),
            fanin: BTreeMap::new(),
            chains: BTreeMap::new(),
        }
    }

    fn run(mut self, builder: &mut RrGraphBuilder) -> RrGraphResult<InterposerReport> {
        let _span = info_span!("interposer", cuts = ?self.cuts).entered();

        let crossings = find_crossings(&builder.view()?, &self.cuts);
        for (node, cut) in crossings {
            self.plans.entry(node).or_default().push(cut);
        }
        if self.plans.is_empty() {
            info!("no wire crosses a cut");
            return Ok(self.report);
        }

        let mut staged = builder.clone();
        self.capture_adjacency(&staged)?;
        staged.reopen();
        let plans = std::mem::take(&mut self.plans);
        for (&node, cuts) in &plans {
            self.split_wire(&mut staged, node, cuts)?;
        }
        self.transfer_edges(&mut staged)?;
        staged.finalize();
        self.validate(&staged)?;
        *builder = staged;

        info!(
            wires_split = self.report.wires_split,
            crossing_nodes = self.report.crossing_nodes,
            derived_switches = self.report.derived_switches,
            edges_transferred = self.report.edges_transferred,
            "interposer pass complete"
        );
        Ok(self.report)
    }

    /// Records the fan-out and fan-in edge handles of every wire to split.
    ///
    /// Handles stay valid until the staged graph is finalized again, since
    /// nothing renumbers edges while building. Endpoints are re-read through
    /// storage when the edges are moved.
    fn capture_adjacency(&mut self, staged: &RrGraphBuilder) -> RrGraphResult<()> {
        let storage = staged.storage();
        for &node in self.plans.keys() {
            self.fanout.insert(node, storage.edges_of(node)?.collect());
        }
        for edge in storage.edge_ids() {
            let sink = storage.edge_sink_node(edge);
            if self.plans.contains_key(&sink) {
                self.fanin.entry(sink).or_default().push(edge);
            }
        }
        Ok(())
    }

    /// The switch crossing edges of `node` are derived from.
    fn base_switch(&self, g: &RrGraphBuilder, node: RrNodeId) -> RrGraphResult<SwitchId> {
        let id = match self.options.crossing_switch {
            Some(raw) => SwitchId::from_raw(raw),
            None => {
                let storage = g.storage();
                self.fanin
                    .get(&node)
                    .and_then(|edges| edges.first())
                    .map(|&edge| storage.edge_switch(edge))
                    .unwrap_or(SwitchId::from_raw(0))
            }
        };
        g.switch(id)?;
        Ok(id)
    }

    /// The slowed-down copy of `base`, created on first use.
    fn derived_switch(&mut self, g: &mut RrGraphBuilder, base: SwitchId) -> RrGraphResult<SwitchId> {
        if let Some(&id) = self.derived_switches.get(&base) {
            return Ok(id);
        }
        let slow = g.switch(base)?.scaled(self.options.delay_multiplier);
        debug!(base = %base, name = %slow.name, "derived crossing switch");
        let id = g.add_switch(slow);
        self.derived_switches.insert(base, id);
        self.report.derived_switches += 1;
        Ok(id)
    }

    /// Splits one wire at every cut it crosses.
    fn split_wire(&mut self, g: &mut RrGraphBuilder, node: RrNodeId, cuts: &[u16]) -> RrGraphResult<()> {
        let mut ordered = cuts.to_vec();
        if g.storage().node_direction(node) == Direction::Inc {
            ordered.sort_unstable();
        } else {
            ordered.sort_unstable_by(|a, b| b.cmp(a));
        }
        let base = self.base_switch(g, node)?;
        let switch = self.derived_switch(g, base)?;

        let mut chain = vec![node];
        let mut subject = node;
        for cut in ordered {
            subject = self.split_segment(g, subject, cut, switch)?;
            chain.push(subject);
        }
        self.chains.insert(node, chain);
        self.report.wires_split += 1;
        Ok(())
    }

    /// Splits `subject` at `cut` and returns the far segment.
    ///
    /// `subject` keeps the part the signal enters first. Its attributes are
    /// re-read here since an earlier split may have moved it.
    fn split_segment(
        &mut self,
        g: &mut RrGraphBuilder,
        subject: RrNodeId,
        cut: u16,
        switch: SwitchId,
    ) -> RrGraphResult<RrNodeId> {
        let storage = g.storage();
        let rect = storage.node_rect(subject);
        if !rect.straddles_row(cut) {
            return Err(RrGraphError::MutationInvariantViolation {
                violations: 1,
                node: subject,
                cut,
            });
        }
        let direction = storage.node_direction(subject);
        let track = storage.node_track_num(subject)?;
        let layer = storage.node_layer(subject);
        let capacity = storage.node_capacity(subject);
        let cost_index = storage.node_cost_index(subject);
        let x = rect.xlow;

        let (kept, far) = if direction == Direction::Inc {
            ((rect.ylow, cut), (cut + 1, rect.yhigh))
        } else {
            ((cut + 1, rect.yhigh), (rect.ylow, cut))
        };
        let crossing_track =
            track
                .checked_add(self.chan_width)
                .ok_or_else(|| RrGraphError::InvalidAttribute {
                    node: subject,
                    attribute: "track number",
                    reason: format!(
                        "crossing track {track} + {} does not fit in a ptc number",
                        self.chan_width
                    ),
                })?;

        g.relocate_node(subject, NodeRect::new(x, kept.0, x, kept.1))?;
        g.add_node_to_all_locs(subject)?;

        let far_node = g.create_node(&NodeSpec {
            kind: RrType::Chany,
            layer,
            rect: NodeRect::new(x, far.0, x, far.1),
            ptc: track,
            direction,
            capacity,
            cost_index,
            sides: SideSet::empty(),
        })?;
        g.copy_node_metadata(subject, far_node);

        let crossing = g.create_node(&NodeSpec {
            kind: RrType::Chany,
            layer,
            rect: NodeRect::cell(x, cut),
            ptc: crossing_track,
            direction,
            capacity: 1,
            cost_index,
            sides: SideSet::empty(),
        })?;

        let configurable = g.switch(switch)?.is_configurable();
        g.emplace_edge(subject, crossing, switch, configurable)?;
        g.emplace_edge(crossing, far_node, switch, configurable)?;
        self.report.crossing_nodes += 1;
        debug!(node = %subject, cut, far = %far_node, crossing = %crossing, "split wire");
        Ok(far_node)
    }

    /// Moves captured edges onto the chain segment nearest their other end.
    fn transfer_edges(&mut self, g: &mut RrGraphBuilder) -> RrGraphResult<()> {
        let chains = std::mem::take(&mut self.chains);
        for (&original, chain) in &chains {
            if self.options.transfer_fanout {
                for &edge in self.fanout.get(&original).into_iter().flatten() {
                    let storage = g.storage();
                    if storage.edge_src_node(edge) != original {
                        continue;
                    }
                    let sink = storage.edge_sink_node(edge);
                    if chain.contains(&sink) {
                        continue;
                    }
                    let target = nearest_segment(storage, chain, storage.node_rect(sink));
                    if target != original {
                        g.set_edge_src_node(edge, target)?;
                        self.report.edges_transferred += 1;
                    }
                }
            }
            if self.options.transfer_fanin {
                for &edge in self.fanin.get(&original).into_iter().flatten() {
                    let storage = g.storage();
                    if storage.edge_sink_node(edge) != original {
                        continue;
                    }
                    let src = storage.edge_src_node(edge);
                    if chain.contains(&src) {
                        continue;
                    }
                    let target = nearest_segment(storage, chain, storage.node_rect(src));
                    if target != original {
                        g.set_edge_sink_node(edge, target)?;
                        self.report.edges_transferred += 1;
                    }
                }
            }
        }
        self.chains = chains;
        Ok(())
    }

    /// Checks that no wire straddles a cut and the lookup is consistent.
    ///
    /// Findings are errors in strict mode and warnings otherwise.
    fn validate(&self, staged: &RrGraphBuilder) -> RrGraphResult<()> {
        let remaining = find_crossings(&staged.view()?, &self.cuts);
        let mut findings = Vec::new();
        if let Some(&(node, cut)) = remaining.first() {
            findings.push(RrGraphError::MutationInvariantViolation {
                violations: remaining.len(),
                node,
                cut,
            });
        }
        if let Err(err) = staged.verify_lookup() {
            findings.push(err);
        }
        if self.options.strict {
            return match findings.into_iter().next() {
                Some(err) => Err(err),
                None => Ok(()),
            };
        }
        for finding in &findings {
            warn!(error = %finding, "interposer validation finding (strict = false)");
        }
        Ok(())
    }
}
