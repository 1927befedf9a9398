//! Node attribute types, the node creation spec and the switch table entry.

use rrg_arch::{ArchSwitch, SwitchKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a routing-resource node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RrType {
    /// Logical signal source inside a block.
    Source,
    /// Logical signal sink inside a block.
    Sink,
    /// Output pin of a block.
    Opin,
    /// Input pin of a block.
    Ipin,
    /// Horizontal routing wire.
    Chanx,
    /// Vertical routing wire.
    Chany,
}

impl RrType {
    /// All kinds, in table order.
    pub const ALL: [RrType; 6] = [
        RrType::Source,
        RrType::Sink,
        RrType::Opin,
        RrType::Ipin,
        RrType::Chanx,
        RrType::Chany,
    ];

    /// Position of this kind in [`RrType::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for CHANX and CHANY.
    pub fn is_wire(self) -> bool {
        matches!(self, RrType::Chanx | RrType::Chany)
    }

    /// Returns `true` for OPIN and IPIN.
    pub fn is_pin(self) -> bool {
        matches!(self, RrType::Opin | RrType::Ipin)
    }

    /// Returns `true` for SOURCE and SINK.
    pub fn is_class(self) -> bool {
        matches!(self, RrType::Source | RrType::Sink)
    }

    /// The conventional upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            RrType::Source => "SOURCE",
            RrType::Sink => "SINK",
            RrType::Opin => "OPIN",
            RrType::Ipin => "IPIN",
            RrType::Chanx => "CHANX",
            RrType::Chany => "CHANY",
        }
    }
}

impl fmt::Display for RrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signal direction of a wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Drives towards increasing coordinates.
    Inc,
    /// Drives towards decreasing coordinates.
    Dec,
    /// Bidirectional, or not a wire.
    #[default]
    None,
}

/// Side of a tile on which a pin sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Top edge.
    Top,
    /// Right edge.
    Right,
    /// Bottom edge.
    Bottom,
    /// Left edge.
    Left,
}

impl Side {
    /// All sides, in lookup search order.
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    /// Position of this side in [`Side::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }
}

/// A set of [`Side`]s, stored as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideSet(u8);

impl SideSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Adds a side. Adding a side twice is a no-op.
    pub fn insert(&mut self, side: Side) {
        self.0 |= side.bit();
    }

    /// Returns `true` if the set contains `side`.
    pub fn contains(self, side: Side) -> bool {
        self.0 & side.bit() != 0
    }

    /// Returns `true` if no side is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of sides in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the sides in [`Side::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Side> {
        Side::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<Side> for SideSet {
    fn from_iter<I: IntoIterator<Item = Side>>(iter: I) -> Self {
        let mut set = SideSet::empty();
        for side in iter {
            set.insert(side);
        }
        set
    }
}

/// Inclusive rectangle of grid cells occupied by a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRect {
    /// Lowest column.
    pub xlow: u16,
    /// Lowest row.
    pub ylow: u16,
    /// Highest column.
    pub xhigh: u16,
    /// Highest row.
    pub yhigh: u16,
}

impl NodeRect {
    /// Creates a rectangle. No ordering check is made here; storage setters
    /// validate before writing.
    pub fn new(xlow: u16, ylow: u16, xhigh: u16, yhigh: u16) -> Self {
        Self {
            xlow,
            ylow,
            xhigh,
            yhigh,
        }
    }

    /// A single cell.
    pub fn cell(x: u16, y: u16) -> Self {
        Self::new(x, y, x, y)
    }

    /// Returns `true` if the rectangle covers one cell.
    pub fn is_single_cell(&self) -> bool {
        self.xlow == self.xhigh && self.ylow == self.yhigh
    }

    /// Returns `true` if rows `c` and `c + 1` are both covered.
    pub fn straddles_row(&self, c: u16) -> bool {
        self.ylow <= c && c < self.yhigh
    }

    /// Number of rows between the y-spans of two rectangles, 0 if they overlap.
    pub fn y_gap(&self, other: &NodeRect) -> u16 {
        if self.yhigh < other.ylow {
            other.ylow - self.yhigh
        } else if other.yhigh < self.ylow {
            self.ylow - other.yhigh
        } else {
            0
        }
    }

    /// Iterates every covered `(x, y)` cell.
    pub fn cells(self) -> impl Iterator<Item = (u16, u16)> {
        (self.xlow..=self.xhigh).flat_map(move |x| (self.ylow..=self.yhigh).map(move |y| (x, y)))
    }
}

/// Every attribute of a node, applied at once by
/// [`RrGraphBuilder::create_node`](crate::RrGraphBuilder::create_node).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Node kind.
    pub kind: RrType,
    /// Die layer.
    pub layer: u8,
    /// Occupied cells.
    pub rect: NodeRect,
    /// Class, pin or track number, depending on the kind.
    pub ptc: u16,
    /// Signal direction. Must be [`Direction::None`] for non-wires.
    pub direction: Direction,
    /// Number of nets that may use the node.
    pub capacity: u16,
    /// Opaque index into the router's cost table.
    pub cost_index: u16,
    /// Pin sides. Must be empty for non-pins.
    pub sides: SideSet,
}

impl NodeSpec {
    fn new(kind: RrType, rect: NodeRect, ptc: u16) -> Self {
        Self {
            kind,
            layer: 0,
            rect,
            ptc,
            direction: Direction::None,
            capacity: 1,
            cost_index: 0,
            sides: SideSet::empty(),
        }
    }

    /// A horizontal wire in row `y` spanning `xlow..=xhigh`.
    pub fn chanx(y: u16, xlow: u16, xhigh: u16, track: u16, direction: Direction) -> Self {
        Self {
            direction,
            ..Self::new(RrType::Chanx, NodeRect::new(xlow, y, xhigh, y), track)
        }
    }

    /// A vertical wire in column `x` spanning `ylow..=yhigh`.
    pub fn chany(x: u16, ylow: u16, yhigh: u16, track: u16, direction: Direction) -> Self {
        Self {
            direction,
            ..Self::new(RrType::Chany, NodeRect::new(x, ylow, x, yhigh), track)
        }
    }

    /// An OPIN or IPIN at one cell.
    pub fn pin(kind: RrType, x: u16, y: u16, pin: u16, sides: SideSet) -> Self {
        Self {
            sides,
            ..Self::new(kind, NodeRect::cell(x, y), pin)
        }
    }

    /// A SOURCE at one cell.
    pub fn source(x: u16, y: u16, class: u16) -> Self {
        Self::new(RrType::Source, NodeRect::cell(x, y), class)
    }

    /// A SINK at one cell.
    pub fn sink(x: u16, y: u16, class: u16) -> Self {
        Self::new(RrType::Sink, NodeRect::cell(x, y), class)
    }

    /// Sets the layer.
    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: u16) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the cost index.
    pub fn with_cost_index(mut self, cost_index: u16) -> Self {
        self.cost_index = cost_index;
        self
    }
}

/// One entry of the graph's switch table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RrSwitch {
    /// Switch name.
    pub name: String,
    /// Electrical style.
    pub kind: SwitchKind,
    /// Output resistance.
    pub r: f32,
    /// Input capacitance.
    pub cin: f32,
    /// Output capacitance.
    pub cout: f32,
    /// Internal capacitance.
    pub cinternal: f32,
    /// Intrinsic delay.
    pub tdel: f32,
    /// Multiplexer transistor size.
    pub mux_trans_size: f32,
    /// Buffer size.
    pub buf_size: f32,
}

impl RrSwitch {
    /// Returns `true` if edges through this switch can be turned off.
    pub fn is_configurable(&self) -> bool {
        self.kind.is_configurable()
    }

    /// A copy with resistance, output capacitance and delay scaled by
    /// `multiplier`, named `<name>_delayed_<multiplier>x`.
    pub fn scaled(&self, multiplier: f64) -> RrSwitch {
        let m = multiplier as f32;
        RrSwitch {
            name: format!("{}_delayed_{}x", self.name, multiplier),
            r: self.r * m,
            cout: self.cout * m,
            tdel: self.tdel * m,
            ..self.clone()
        }
    }
}

impl From<&ArchSwitch> for RrSwitch {
    fn from(sw: &ArchSwitch) -> Self {
        RrSwitch {
            name: sw.name.clone(),
            kind: sw.kind,
            r: sw.r,
            cin: sw.cin,
            cout: sw.cout,
            cinternal: sw.cinternal,
            tdel: sw.tdel,
            mux_trans_size: sw.mux_trans_size,
            buf_size: sw.buf_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_predicates() {
        assert!(RrType::Chanx.is_wire());
        assert!(!RrType::Opin.is_wire());
        assert!(RrType::Ipin.is_pin());
        assert!(RrType::Sink.is_class());
        assert_eq!(RrType::Chany.to_string(), "CHANY");
        for (i, kind) in RrType::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn side_set_membership() {
        let mut sides = SideSet::empty();
        assert!(sides.is_empty());
        sides.insert(Side::Left);
        sides.insert(Side::Top);
        sides.insert(Side::Left);
        assert_eq!(sides.len(), 2);
        assert!(sides.contains(Side::Top));
        assert!(!sides.contains(Side::Bottom));
        assert_eq!(sides.iter().collect::<Vec<_>>(), vec![Side::Top, Side::Left]);
    }

    #[test]
    fn side_set_from_iter() {
        let sides: SideSet = [Side::Right, Side::Bottom].into_iter().collect();
        assert!(sides.contains(Side::Right));
        assert_eq!(sides.len(), 2);
    }

    #[test]
    fn rect_straddle() {
        let rect = NodeRect::new(2, 2, 2, 8);
        assert!(rect.straddles_row(2));
        assert!(rect.straddles_row(7));
        assert!(!rect.straddles_row(8));
        assert!(!rect.straddles_row(1));
    }

    #[test]
    fn rect_y_gap() {
        let a = NodeRect::new(0, 0, 0, 4);
        assert_eq!(a.y_gap(&NodeRect::cell(3, 2)), 0);
        assert_eq!(a.y_gap(&NodeRect::new(1, 7, 1, 9)), 3);
        assert_eq!(NodeRect::new(1, 7, 1, 9).y_gap(&a), 3);
    }

    #[test]
    fn rect_cells() {
        let cells: Vec<_> = NodeRect::new(1, 3, 2, 3).cells().collect();
        assert_eq!(cells, vec![(1, 3), (2, 3)]);
        assert_eq!(NodeRect::new(4, 0, 4, 10).cells().count(), 11);
    }

    #[test]
    fn spec_constructors() {
        let spec = NodeSpec::chany(2, 0, 10, 3, Direction::Inc).with_cost_index(4);
        assert_eq!(spec.kind, RrType::Chany);
        assert_eq!(spec.rect, NodeRect::new(2, 0, 2, 10));
        assert_eq!(spec.ptc, 3);
        assert_eq!(spec.capacity, 1);
        assert_eq!(spec.cost_index, 4);
        let pin = NodeSpec::pin(RrType::Opin, 5, 5, 0, [Side::Top].into_iter().collect());
        assert!(pin.rect.is_single_cell());
        assert_eq!(pin.direction, Direction::None);
    }

    #[test]
    fn scaled_switch() {
        let base = RrSwitch {
            name: "L4_mux".into(),
            kind: SwitchKind::Mux,
            r: 100.0,
            cin: 1.0,
            cout: 2.0,
            cinternal: 0.5,
            tdel: 10.0,
            mux_trans_size: 1.0,
            buf_size: 4.0,
        };
        let slow = base.scaled(3.0);
        assert_eq!(slow.name, "L4_mux_delayed_3x");
        assert_eq!(slow.r, 300.0);
        assert_eq!(slow.cout, 6.0);
        assert_eq!(slow.tdel, 30.0);
        assert_eq!(slow.cin, base.cin);
        assert_eq!(slow.cinternal, base.cinternal);
        assert_eq!(slow.buf_size, base.buf_size);
    }
}
