//! Opaque handle newtypes for routing-resource graph entities.
//!
//! [`RrNodeId`] and [`RrEdgeId`] are thin `u32` wrappers. They are distinct,
//! non-interchangeable types with no arithmetic: the only way to make one is
//! [`from_raw`](RrNodeId::from_raw), and the only way to step through a
//! node's edges is the [`EdgeRange`] iterator.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the ID as an array index.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable handle for a node in the routing-resource graph.
    RrNodeId
);

define_id!(
    /// Opaque, copyable handle for an edge in the routing-resource graph.
    ///
    /// Edge handles are stable while the graph is building and are
    /// renumbered by every finalize.
    RrEdgeId
);

/// The contiguous edges leaving one node in a finalized graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeRange {
    next: u32,
    end: u32,
}

impl EdgeRange {
    pub(crate) fn new(first: u32, end: u32) -> Self {
        Self { next: first, end }
    }

    /// Returns `true` if the node has no outgoing edges.
    pub fn is_empty(&self) -> bool {
        self.next >= self.end
    }
}

impl Iterator for EdgeRange {
    type Item = RrEdgeId;

    fn next(&mut self) -> Option<RrEdgeId> {
        if self.next < self.end {
            let id = RrEdgeId::from_raw(self.next);
            self.next += 1;
            Some(id)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end.saturating_sub(self.next) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for EdgeRange {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn node_id_roundtrip() {
        let id = RrNodeId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(RrEdgeId::from_raw(1));
        set.insert(RrEdgeId::from_raw(2));
        set.insert(RrEdgeId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", RrNodeId::from_raw(9)), "9");
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = RrNodeId::from_raw(55);
        let json = serde_json::to_string(&id).unwrap();
        let restored: RrNodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn edge_range_yields_contiguous_ids() {
        let range = EdgeRange::new(3, 6);
        assert_eq!(range.len(), 3);
        let ids: Vec<u32> = range.map(RrEdgeId::as_raw).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn empty_edge_range() {
        let mut range = EdgeRange::new(4, 4);
        assert!(range.is_empty());
        assert_eq!(range.next(), None);
    }
}
