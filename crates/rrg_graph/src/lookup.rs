//! Spatial lookup from `(layer, x, y, kind, ptc, side)` to node handles.
//!
//! One dense table per `(layer, kind)`, indexed by grid cell, each cell holding
//! a vector indexed by ptc number with one slot per [`Side`]. Only OPIN and
//! IPIN use the side slots; every other kind stores its node in slot 0 and
//! ignores the side argument.
//!
//! CHANX tables are laid out row-major and all others column-major, so a
//! channel's nodes along its length are adjacent in memory. Callers always
//! pass logical `(x, y)`.

use crate::error::{RrGraphError, RrGraphResult};
use crate::ids::RrNodeId;
use crate::permutation::NodePermutation;
use crate::types::{RrType, Side};
use rrg_arch::DeviceGrid;
use serde::{Deserialize, Serialize};
use std::fmt;

const NUM_KINDS: usize = RrType::ALL.len();
const NUM_SLOTS: usize = Side::ALL.len();

type PtcSlots = [Option<RrNodeId>; NUM_SLOTS];

/// A position in the spatial lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Die layer.
    pub layer: u8,
    /// Logical column.
    pub x: u16,
    /// Logical row.
    pub y: u16,
    /// Node kind.
    pub kind: RrType,
    /// Class, pin or track number.
    pub ptc: u16,
    /// Pin side. Ignored for non-pins; `None` on a pin lookup searches
    /// every side.
    pub side: Option<Side>,
}

impl Location {
    /// A location with no side.
    pub fn new(layer: u8, x: u16, y: u16, kind: RrType, ptc: u16) -> Self {
        Self {
            layer,
            x,
            y,
            kind,
            ptc,
            side: None,
        }
    }

    /// The same location on a specific side.
    pub fn on_side(self, side: Side) -> Self {
        Self {
            side: Some(side),
            ..self
        }
    }

    /// Candidate slots for this location.
    fn slots(&self) -> &'static [usize] {
        static ALL: [usize; NUM_SLOTS] = [0, 1, 2, 3];
        match (self.kind.is_pin(), self.side) {
            (true, Some(side)) => &ALL[side.index()..=side.index()],
            (true, None) => &ALL[..],
            (false, _) => &ALL[..1],
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ptc {} at ({},{}) layer {}",
            self.kind, self.ptc, self.x, self.y, self.layer
        )?;
        if let (true, Some(side)) = (self.kind.is_pin(), self.side) {
            write!(f, " side {side:?}")?;
        }
        Ok(())
    }
}

/// The spatial index of a routing-resource graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialLookup {
    grid: DeviceGrid,
    /// `tables[layer * NUM_KINDS + kind][cell][ptc][slot]`
    tables: Vec<Vec<Vec<PtcSlots>>>,
    len: usize,
}

impl SpatialLookup {
    /// Creates an empty lookup covering every cell of `grid`.
    pub fn new(grid: DeviceGrid) -> Self {
        let tables = vec![vec![Vec::new(); grid.cells_per_layer()]; grid.layers as usize * NUM_KINDS];
        Self {
            grid,
            tables,
            len: 0,
        }
    }

    /// The grid this lookup covers.
    pub fn grid(&self) -> DeviceGrid {
        self.grid
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Empties every slot, keeping the table dimensions.
    pub fn clear(&mut self) {
        for table in &mut self.tables {
            table.iter_mut().for_each(Vec::clear);
        }
        self.len = 0;
    }

    /// Checks that the table dimensions and the slot count agree with the
    /// grid. A freshly built lookup always passes; a decoded one may not.
    pub fn check_shape(&self) -> RrGraphResult<()> {
        let tables = self.grid.layers as usize * NUM_KINDS;
        if self.tables.len() != tables {
            return Err(RrGraphError::LookupInconsistency {
                reason: format!(
                    "lookup has {} tables, grid needs {tables}",
                    self.tables.len()
                ),
            });
        }
        let cells = self.grid.cells_per_layer();
        if let Some((t, table)) = self
            .tables
            .iter()
            .enumerate()
            .find(|(_, table)| table.len() != cells)
        {
            return Err(RrGraphError::LookupInconsistency {
                reason: format!(
                    "lookup table {t} has {} cells, grid needs {cells}",
                    table.len()
                ),
            });
        }
        let occupied = self.entries().count();
        if occupied != self.len {
            return Err(RrGraphError::LookupInconsistency {
                reason: format!("lookup records {} entries but holds {occupied}", self.len),
            });
        }
        Ok(())
    }

    fn in_bounds(&self, loc: &Location) -> bool {
        self.grid.contains_layer(loc.layer) && self.grid.contains(loc.x, loc.y)
    }

    fn table_index(loc: &Location) -> usize {
        loc.layer as usize * NUM_KINDS + loc.kind.index()
    }

    fn cell_index(&self, kind: RrType, x: u16, y: u16) -> usize {
        let (width, height) = (self.grid.width as usize, self.grid.height as usize);
        if kind == RrType::Chanx {
            y as usize * width + x as usize
        } else {
            x as usize * height + y as usize
        }
    }

    fn cell_coords(&self, kind: RrType, cell: usize) -> (u16, u16) {
        let (width, height) = (self.grid.width as usize, self.grid.height as usize);
        if kind == RrType::Chanx {
            ((cell % width) as u16, (cell / width) as u16)
        } else {
            ((cell / height) as u16, (cell % height) as u16)
        }
    }

    fn ptc_slots(&self, loc: &Location) -> Option<&PtcSlots> {
        if !self.in_bounds(loc) {
            return None;
        }
        let cell = self.cell_index(loc.kind, loc.x, loc.y);
        self.tables[Self::table_index(loc)][cell].get(loc.ptc as usize)
    }

    /// Records `node` at `loc`.
    ///
    /// Re-adding the same node is a no-op. Fails with
    /// [`RrGraphError::LookupInconsistency`] if another node holds the slot,
    /// and with [`RrGraphError::InvalidAttribute`] for a pin without a side.
    pub fn add(&mut self, node: RrNodeId, loc: Location) -> RrGraphResult<()> {
        if !self.in_bounds(&loc) {
            return Err(RrGraphError::OutOfBoundsGeometry {
                node,
                reason: format!("lookup location {loc} is outside the grid"),
            });
        }
        let slot = match (loc.kind.is_pin(), loc.side) {
            (true, Some(side)) => side.index(),
            (true, None) => {
                return Err(RrGraphError::InvalidAttribute {
                    node,
                    attribute: "side",
                    reason: "pin lookup entries need a side".into(),
                })
            }
            (false, _) => 0,
        };
        let cell = self.cell_index(loc.kind, loc.x, loc.y);
        let ptcs = &mut self.tables[Self::table_index(&loc)][cell];
        let ptc = loc.ptc as usize;
        if ptcs.len() <= ptc {
            ptcs.resize(ptc + 1, [None; NUM_SLOTS]);
        }
        match ptcs[ptc][slot] {
            None => {
                ptcs[ptc][slot] = Some(node);
                self.len += 1;
                Ok(())
            }
            Some(existing) if existing == node => Ok(()),
            Some(existing) => Err(RrGraphError::LookupInconsistency {
                reason: format!("{loc} already holds node {existing}, cannot add node {node}"),
            }),
        }
    }

    /// Clears every slot at `loc` that holds `node`. Returns `true` if any did.
    pub fn remove(&mut self, node: RrNodeId, loc: Location) -> bool {
        if !self.in_bounds(&loc) {
            return false;
        }
        let cell = self.cell_index(loc.kind, loc.x, loc.y);
        let Some(slots) = self.tables[Self::table_index(&loc)][cell].get_mut(loc.ptc as usize)
        else {
            return false;
        };
        let mut removed = 0;
        for &slot in loc.slots() {
            if slots[slot] == Some(node) {
                slots[slot] = None;
                removed += 1;
            }
        }
        self.len -= removed;
        removed > 0
    }

    /// The node at `loc`, if any. Out-of-grid locations resolve to `None`.
    pub fn lookup(&self, loc: Location) -> Option<RrNodeId> {
        let slots = self.ptc_slots(&loc)?;
        loc.slots().iter().find_map(|&slot| slots[slot])
    }

    /// Every node of `kind` at a cell, in ptc order.
    pub fn find_channel_nodes(&self, layer: u8, x: u16, y: u16, kind: RrType) -> Vec<RrNodeId> {
        let loc = Location::new(layer, x, y, kind, 0);
        if !self.in_bounds(&loc) {
            return Vec::new();
        }
        let cell = self.cell_index(kind, x, y);
        self.tables[Self::table_index(&loc)][cell]
            .iter()
            .filter_map(|slots| slots[0])
            .collect()
    }

    /// Every distinct node registered for a pin on any side.
    pub fn find_pin_nodes_at_all_sides(
        &self,
        layer: u8,
        x: u16,
        y: u16,
        kind: RrType,
        ptc: u16,
    ) -> Vec<RrNodeId> {
        let mut nodes = Vec::new();
        if let Some(slots) = self.ptc_slots(&Location::new(layer, x, y, kind, ptc)) {
            for node in slots.iter().flatten() {
                if !nodes.contains(node) {
                    nodes.push(*node);
                }
            }
        }
        nodes
    }

    /// Returns `true` if every stored handle is below `node_count`.
    pub fn references_within(&self, node_count: usize) -> bool {
        self.entries().all(|(_, node)| node.index() < node_count)
    }

    /// Rewrites every stored handle through `perm`.
    pub(crate) fn remap(&mut self, perm: &NodePermutation) {
        for slot in self
            .tables
            .iter_mut()
            .flatten()
            .flatten()
            .flat_map(|slots| slots.iter_mut())
        {
            if let Some(node) = slot {
                *node = perm.new_id(*node);
            }
        }
    }

    /// Iterates every occupied slot with its location.
    pub fn entries(&self) -> impl Iterator<Item = (Location, RrNodeId)> + '_ {
        self.tables.iter().enumerate().flat_map(move |(t, table)| {
            let layer = (t / NUM_KINDS) as u8;
            let kind = RrType::ALL[t % NUM_KINDS];
            table.iter().enumerate().flat_map(move |(cell, ptcs)| {
                let (x, y) = self.cell_coords(kind, cell);
                ptcs.iter().enumerate().flat_map(move |(ptc, slots)| {
                    slots.iter().enumerate().filter_map(move |(slot, node)| {
                        let node = (*node)?;
                        let side = kind.is_pin().then(|| Side::ALL[slot]);
                        Some((
                            Location {
                                layer,
                                x,
                                y,
                                kind,
                                ptc: ptc as u16,
                                side,
                            },
                            node,
                        ))
                    })
                })
            })
        })
    }
}
