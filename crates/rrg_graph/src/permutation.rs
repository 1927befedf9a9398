//! Node permutations, as produced by the reorder pass.

use crate::error::{RrGraphError, RrGraphResult};
use crate::ids::RrNodeId;

/// A bijection over node ids, stored in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePermutation {
    old_to_new: Vec<RrNodeId>,
    new_to_old: Vec<RrNodeId>,
}

impl NodePermutation {
    /// The permutation that maps every node to itself.
    pub fn identity(len: usize) -> Self {
        let ids: Vec<RrNodeId> = (0..len as u32).map(RrNodeId::from_raw).collect();
        Self {
            old_to_new: ids.clone(),
            new_to_old: ids,
        }
    }

    /// Builds a permutation from its new-to-old order: `order[new] == old`.
    ///
    /// Fails with [`RrGraphError::InvalidPermutation`] unless `order` names
    /// every id in `0..order.len()` exactly once.
    pub fn from_new_to_old(order: Vec<RrNodeId>) -> RrGraphResult<Self> {
        let len = order.len();
        let mut old_to_new: Vec<Option<RrNodeId>> = vec![None; len];
        for (new, &old) in order.iter().enumerate() {
            let slot = old_to_new
                .get_mut(old.index())
                .ok_or_else(|| RrGraphError::InvalidPermutation {
                    reason: format!("node {old} is outside 0..{len}"),
                })?;
            if slot.is_some() {
                return Err(RrGraphError::InvalidPermutation {
                    reason: format!("node {old} appears more than once"),
                });
            }
            *slot = Some(RrNodeId::from_raw(new as u32));
        }
        // every slot is filled: len distinct in-range values were placed
        let old_to_new = old_to_new.into_iter().flatten().collect();
        Ok(Self {
            old_to_new,
            new_to_old: order,
        })
    }

    /// Number of nodes the permutation covers.
    pub fn len(&self) -> usize {
        self.new_to_old.len()
    }

    /// Returns `true` for the permutation over zero nodes.
    pub fn is_empty(&self) -> bool {
        self.new_to_old.is_empty()
    }

    /// Returns `true` if every node keeps its id.
    pub fn is_identity(&self) -> bool {
        self.new_to_old
            .iter()
            .enumerate()
            .all(|(i, old)| old.index() == i)
    }

    /// The new id of `old`.
    ///
    /// # Panics
    ///
    /// Panics if `old` is outside the permutation.
    pub fn new_id(&self, old: RrNodeId) -> RrNodeId {
        self.old_to_new[old.index()]
    }

    /// The old id of `new`.
    ///
    /// # Panics
    ///
    /// Panics if `new` is outside the permutation.
    pub fn old_id(&self, new: RrNodeId) -> RrNodeId {
        self.new_to_old[new.index()]
    }

    /// The new-to-old order.
    pub fn new_to_old(&self) -> &[RrNodeId] {
        &self.new_to_old
    }
}
