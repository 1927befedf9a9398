//! Option types deserialized from `rrgraph.toml`.

use serde::{Deserialize, Serialize};

/// The top-level graph-construction options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphOptions {
    /// Node reordering pass.
    #[serde(default)]
    pub reorder: ReorderOptions,
    /// Multi-die interposer mutation pass.
    #[serde(default)]
    pub interposer: InterposerOptions,
}

/// Node permutation policy applied for memory locality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderAlgorithm {
    /// Leave node ids as built.
    #[default]
    None,
    /// Sort by total degree, then by breadth-first discovery order.
    DegreeBfs,
    /// Seeded uniform shuffle, for reproducible experiments.
    RandomShuffle,
}

/// Settings for the node reordering pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReorderOptions {
    /// Which permutation to apply.
    #[serde(default)]
    pub algorithm: ReorderAlgorithm,
    /// Graphs with fewer nodes than this are left untouched.
    #[serde(default)]
    pub threshold: usize,
    /// Seed for [`ReorderAlgorithm::RandomShuffle`].
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    1
}

impl Default for ReorderOptions {
    fn default() -> Self {
        Self {
            algorithm: ReorderAlgorithm::None,
            threshold: 0,
            seed: default_seed(),
        }
    }
}

/// Settings for the multi-die interposer mutation pass.
///
/// The pass is enabled when either `cuts` is non-empty or `num_cuts` is
/// non-zero. Explicit `cuts` and derived `num_cuts` are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InterposerOptions {
    /// Explicit die-boundary rows.
    #[serde(default)]
    pub cuts: Vec<u16>,
    /// Number of evenly spaced cuts to derive from the grid height.
    #[serde(default)]
    pub num_cuts: u16,
    /// Factor applied to resistance, output capacitance and delay of switches
    /// that cross a cut.
    #[serde(default = "default_delay_multiplier")]
    pub delay_multiplier: f64,
    /// Treat post-pass validation findings as errors instead of warnings.
    #[serde(default = "default_true")]
    pub strict: bool,
    /// Move edges that drive a split wire onto the nearest segment.
    #[serde(default = "default_true")]
    pub transfer_fanin: bool,
    /// Move edges driven by a split wire onto the nearest segment.
    #[serde(default = "default_true")]
    pub transfer_fanout: bool,
    /// Base switch for crossing edges; defaults to the split wire's driver switch.
    #[serde(default)]
    pub crossing_switch: Option<u32>,
}

fn default_delay_multiplier() -> f64 {
    3.0
}

fn default_true() -> bool {
    true
}

impl Default for InterposerOptions {
    fn default() -> Self {
        Self {
            cuts: Vec::new(),
            num_cuts: 0,
            delay_multiplier: default_delay_multiplier(),
            strict: true,
            transfer_fanin: true,
            transfer_fanout: true,
            crossing_switch: None,
        }
    }
}

impl InterposerOptions {
    /// Returns `true` if the interposer pass should run.
    pub fn is_enabled(&self) -> bool {
        !self.cuts.is_empty() || self.num_cuts > 0
    }

    /// Creates options for the given explicit cut rows, other settings default.
    pub fn with_cuts(cuts: impl IntoIterator<Item = u16>) -> Self {
        Self {
            cuts: cuts.into_iter().collect(),
            ..Self::default()
        }
    }
}
