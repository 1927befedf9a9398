//! Typed architecture description consumed by routing-resource graph construction.
//!
//! The architecture file parser lives outside this workspace; it produces an
//! [`ArchDescription`] holding the device grid, the switch table and the
//! tile heights. Graph construction reads it but never modifies it.
//!
//! The [`cuts`] module derives die-boundary rows for multi-die devices.

#![warn(missing_docs)]

pub mod cuts;
pub mod error;
pub mod ids;
pub mod types;

pub use cuts::{interposer_cut_locations, lcm_of_block_heights};
pub use error::ArchError;
pub use ids::SwitchId;
pub use types::{ArchDescription, ArchSwitch, DeviceGrid, SwitchKind, TileType};
