//! Architecture description types.
//!
//! These mirror what the architecture file parser hands to graph construction:
//! the device grid extent, the electrical switch table and the physical tile
//! types.

use crate::error::ArchError;
use crate::ids::SwitchId;
use serde::{Deserialize, Serialize};

/// Extent of the device grid across all dies.
///
/// Valid cell coordinates are `0..width` and `0..height`; valid layers are
/// `0..layers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceGrid {
    /// Number of columns.
    pub width: u16,
    /// Number of rows.
    pub height: u16,
    /// Number of stacked die layers.
    pub layers: u8,
}

impl DeviceGrid {
    /// Creates a grid, rejecting zero-sized dimensions.
    pub fn new(width: u16, height: u16, layers: u8) -> Result<Self, ArchError> {
        if width == 0 || height == 0 || layers == 0 {
            return Err(ArchError::EmptyGrid {
                width,
                height,
                layers,
            });
        }
        Ok(Self {
            width,
            height,
            layers,
        })
    }

    /// Returns `true` if `(x, y)` is a cell of the grid.
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    /// Returns `true` if `layer` is one of the grid's dies.
    pub fn contains_layer(&self, layer: u8) -> bool {
        layer < self.layers
    }

    /// Returns the number of cells on one layer.
    pub fn cells_per_layer(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// The electrical style of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchKind {
    /// Buffered multiplexer.
    Mux,
    /// Tristate buffer.
    Tristate,
    /// Unbuffered pass transistor.
    PassGate,
    /// Electrical short (no delay, not configurable).
    Short,
    /// Non-configurable buffer.
    Buffer,
}

impl SwitchKind {
    /// Returns `true` if a switch of this kind can be turned on and off.
    pub fn is_configurable(self) -> bool {
        !matches!(self, SwitchKind::Short | SwitchKind::Buffer)
    }
}

/// One row of the architecture switch table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchSwitch {
    /// Switch name as written in the architecture file.
    pub name: String,
    /// Electrical style.
    pub kind: SwitchKind,
    /// Output resistance in ohms.
    pub r: f32,
    /// Input capacitance in farads.
    pub cin: f32,
    /// Output capacitance in farads.
    pub cout: f32,
    /// Internal capacitance in farads.
    pub cinternal: f32,
    /// Intrinsic delay in seconds.
    pub tdel: f32,
    /// Size of the multiplexer transistors, in minimum-width units.
    pub mux_trans_size: f32,
    /// Size of the output buffer, in minimum-width units.
    pub buf_size: f32,
}

/// A physical tile type, as far as graph construction cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileType {
    /// Tile name.
    pub name: String,
    /// Width in grid cells.
    pub width: u16,
    /// Height in grid cells.
    pub height: u16,
}

/// Everything graph construction reads from the architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchDescription {
    /// Device name.
    pub name: String,
    /// Device grid extent.
    pub grid: DeviceGrid,
    /// Maximum routing channel width (tracks per channel).
    pub chan_width: u16,
    /// Switch table.
    pub switches: Vec<ArchSwitch>,
    /// Physical tile types.
    #[serde(default)]
    pub tile_types: Vec<TileType>,
}

impl ArchDescription {
    /// Returns the switch with the given ID, if it exists.
    pub fn switch(&self, id: SwitchId) -> Option<&ArchSwitch> {
        self.switches.get(id.index())
    }

    /// Returns the heights of all tile types, in declaration order.
    pub fn block_heights(&self) -> impl Iterator<Item = u16> + '_ {
        self.tile_types.iter().map(|t| t.height)
    }
}
