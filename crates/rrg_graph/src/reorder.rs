//! Node permutations computed for memory locality during routing.
//!
//! The permutation is computed entirely from a read-only borrow of the
//! storage. Applying it is the builder's job, see
//! [`RrGraphBuilder::reorder_nodes`](crate::RrGraphBuilder::reorder_nodes).

use crate::error::RrGraphResult;
use crate::ids::RrNodeId;
use crate::permutation::NodePermutation;
use crate::storage::NodeStorage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rrg_config::ReorderAlgorithm;
use std::cmp::Reverse;
use std::collections::VecDeque;

/// Computes the permutation `algorithm` prescribes for `storage`.
///
/// [`ReorderAlgorithm::DegreeBfs`] needs finalized edges.
pub fn compute_permutation(
    storage: &NodeStorage,
    algorithm: ReorderAlgorithm,
    seed: u64,
) -> RrGraphResult<NodePermutation> {
    let order = match algorithm {
        ReorderAlgorithm::None => return Ok(NodePermutation::identity(storage.len())),
        ReorderAlgorithm::DegreeBfs => degree_bfs_order(storage)?,
        ReorderAlgorithm::RandomShuffle => random_order(storage.len(), seed),
    };
    NodePermutation::from_new_to_old(order)
}

/// Orders nodes by descending total degree, then by breadth-first discovery.
///
/// The search starts from every undiscovered node in id order, so all
/// components are covered. A popped node adds its out-edge count to its own
/// degree and each edge adds one to its sink, so every node ends up with
/// fan-in plus fan-out.
pub fn degree_bfs_order(storage: &NodeStorage) -> RrGraphResult<Vec<RrNodeId>> {
    let n = storage.len();
    let mut discovery: Vec<Option<u32>> = vec![None; n];
    let mut degree = vec![0u32; n];
    let mut queue = VecDeque::new();
    let mut next_index = 0u32;

    for root in storage.node_ids() {
        if discovery[root.index()].is_some() {
            continue;
        }
        discovery[root.index()] = Some(next_index);
        next_index += 1;
        queue.push_back(root);

        while let Some(node) = queue.pop_front() {
            let edges = storage.edges_of(node)?;
            degree[node.index()] += edges.len() as u32;
            for edge in edges {
                let sink = storage.edge_sink_node(edge);
                degree[sink.index()] += 1;
                if discovery[sink.index()].is_none() {
                    discovery[sink.index()] = Some(next_index);
                    next_index += 1;
                    queue.push_back(sink);
                }
            }
        }
    }

    let mut order: Vec<RrNodeId> = storage.node_ids().collect();
    order.sort_by_key(|id| (Reverse(degree[id.index()]), discovery[id.index()]));
    Ok(order)
}

/// A uniform shuffle of `0..len`, reproducible for a given seed.
pub fn random_order(len: usize, seed: u64) -> Vec<RrNodeId> {
    let mut order: Vec<RrNodeId> = (0..len as u32).map(RrNodeId::from_raw).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrg_arch::{DeviceGrid, SwitchId};

    fn node(raw: u32) -> RrNodeId {
        RrNodeId::from_raw(raw)
    }

    fn storage_with_edges(n: usize, edges: &[(u32, u32)]) -> NodeStorage {
        let mut s = NodeStorage::new(DeviceGrid::new(4, 4, 1).unwrap());
        s.resize(n).unwrap();
        for &(src, sink) in edges {
            s.emplace_edge(node(src), node(sink), SwitchId::from_raw(0), true)
                .unwrap();
        }
        s.finalize();
        s
    }

    #[test]
    fn hub_moves_first() {
        // node 3 drives 0, 1 and 2; 5 drives 4
        let s = storage_with_edges(6, &[(3, 0), (3, 1), (3, 2), (5, 4)]);
        let order = degree_bfs_order(&s).unwrap();
        let raw: Vec<u32> = order.iter().map(|id| id.as_raw()).collect();
        assert_eq!(raw, vec![3, 0, 1, 2, 4, 5]);
    }

    #[test]
    fn ties_follow_discovery_order() {
        // 0 -> 2 is discovered before 1 when searching from 0
        let s = storage_with_edges(3, &[(0, 2), (1, 0)]);
        let order = degree_bfs_order(&s).unwrap();
        let raw: Vec<u32> = order.iter().map(|id| id.as_raw()).collect();
        // degrees: 0 -> 2, 1 -> 1, 2 -> 1; discovery 0, 2, 1
        assert_eq!(raw, vec![0, 2, 1]);
    }

    #[test]
    fn degree_bfs_needs_finalized_edges() {
        let mut s = NodeStorage::new(DeviceGrid::new(4, 4, 1).unwrap());
        s.resize(2).unwrap();
        assert!(degree_bfs_order(&s).is_err());
    }

    #[test]
    fn random_order_is_seeded() {
        let a = random_order(50, 42);
        let b = random_order(50, 42);
        assert_eq!(a, b);
        let c = random_order(50, 43);
        assert_ne!(a, c);
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..50).map(node).collect::<Vec<_>>());
    }

    #[test]
    fn none_is_identity() {
        let s = storage_with_edges(4, &[(0, 1)]);
        let perm = compute_permutation(&s, ReorderAlgorithm::None, 1).unwrap();
        assert!(perm.is_identity());
    }

    #[test]
    fn computed_permutation_is_bijection() {
        let s = storage_with_edges(5, &[(4, 0), (4, 1), (2, 3)]);
        let perm = compute_permutation(&s, ReorderAlgorithm::DegreeBfs, 0).unwrap();
        assert_eq!(perm.old_id(node(0)), node(4));
        assert_eq!(perm.len(), 5);
    }
}
