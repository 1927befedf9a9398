//! Free-form string metadata attached to nodes and edges.
//!
//! A [`MetadataStore`] maps a key to an insertion-ordered list of
//! `(name, value)` pairs. The key type decides how a node permutation
//! rewrites it, so one store implementation serves both nodes and edges.

use crate::ids::RrNodeId;
use crate::permutation::NodePermutation;
use rrg_arch::SwitchId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A key that metadata can be attached to.
pub trait MetadataKey: Copy + Ord + fmt::Debug + Serialize + DeserializeOwned {
    /// The key after every node it names is renumbered by `perm`.
    fn remap_nodes(self, perm: &NodePermutation) -> Self;

    /// Returns `true` if every node the key names is below `node_count`.
    fn references_within(self, node_count: usize) -> bool;
}

impl MetadataKey for RrNodeId {
    fn remap_nodes(self, perm: &NodePermutation) -> Self {
        perm.new_id(self)
    }

    fn references_within(self, node_count: usize) -> bool {
        self.index() < node_count
    }
}

/// Identifies an edge by its endpoints and switch, so that edge metadata
/// survives edge renumbering on finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source node.
    pub src: RrNodeId,
    /// Sink node.
    pub sink: RrNodeId,
    /// Switch used by the edge.
    pub switch: SwitchId,
}

impl EdgeKey {
    /// Creates a key.
    pub fn new(src: RrNodeId, sink: RrNodeId, switch: SwitchId) -> Self {
        Self { src, sink, switch }
    }
}

impl MetadataKey for EdgeKey {
    fn remap_nodes(self, perm: &NodePermutation) -> Self {
        Self {
            src: perm.new_id(self.src),
            sink: perm.new_id(self.sink),
            switch: self.switch,
        }
    }

    fn references_within(self, node_count: usize) -> bool {
        self.src.index() < node_count && self.sink.index() < node_count
    }
}

/// One `(name, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Entry name.
    pub name: String,
    /// Entry value.
    pub value: String,
}

/// Metadata lists keyed by `K`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "K: Serialize", deserialize = "K: MetadataKey"))]
pub struct MetadataStore<K: MetadataKey> {
    entries: BTreeMap<K, Vec<MetadataEntry>>,
}

/// Node metadata.
pub type NodeMetadata = MetadataStore<RrNodeId>;

/// Edge metadata.
pub type EdgeMetadata = MetadataStore<EdgeKey>;

impl<K: MetadataKey> Default for MetadataStore<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: MetadataKey> MetadataStore<K> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry to `key`'s list.
    pub fn add(&mut self, key: K, name: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key).or_default().push(MetadataEntry {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Entries of `key` in insertion order; empty if there are none.
    pub fn get(&self, key: K) -> &[MetadataEntry] {
        self.entries.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Value of the first entry named `name`.
    pub fn get_value(&self, key: K, name: &str) -> Option<&str> {
        self.get(key)
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    /// Returns `true` if `key` has at least one entry.
    pub fn contains_key(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    /// Number of keys with entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key has entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates keys and their entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &[MetadataEntry])> {
        self.entries.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Removes and returns the entries of `key`.
    pub fn remove(&mut self, key: K) -> Vec<MetadataEntry> {
        self.entries.remove(&key).unwrap_or_default()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Rewrites every key through `f`.
    ///
    /// Keys that collide are merged, lists appended in old key order.
    pub fn remap_keys(&mut self, f: impl Fn(K) -> K) {
        let old = std::mem::take(&mut self.entries);
        for (key, list) in old {
            self.entries.entry(f(key)).or_default().extend(list);
        }
    }

    /// Rewrites every key through a node permutation.
    pub fn remap_nodes(&mut self, perm: &NodePermutation) {
        self.remap_keys(|key| key.remap_nodes(perm));
    }

    /// Moves the entries of `old` to the end of `new`'s list.
    pub fn rekey(&mut self, old: K, new: K) {
        if old == new {
            return;
        }
        if let Some(list) = self.entries.remove(&old) {
            self.entries.entry(new).or_default().extend(list);
        }
    }

    /// Appends a copy of `from`'s entries to `to`'s list.
    pub fn copy_entries(&mut self, from: K, to: K) {
        let list = self.get(from).to_vec();
        if !list.is_empty() {
            self.entries.entry(to).or_default().extend(list);
        }
    }

    /// Returns `true` if every key names only nodes below `node_count`.
    pub fn references_within(&self, node_count: usize) -> bool {
        self.entries.keys().all(|k| k.references_within(node_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(raw: u32) -> RrNodeId {
        RrNodeId::from_raw(raw)
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut store = NodeMetadata::new();
        store.add(node(1), "fasm", "CLB_X1Y1.SW");
        store.add(node(1), "alias", "n1");
        store.add(node(1), "fasm", "ignored");
        let names: Vec<_> = store.get(node(1)).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["fasm", "alias", "fasm"]);
        assert_eq!(store.get_value(node(1), "fasm"), Some("CLB_X1Y1.SW"));
        assert_eq!(store.get_value(node(1), "missing"), None);
        assert!(store.get(node(0)).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remap_nodes_moves_lists() {
        let mut store = NodeMetadata::new();
        store.add(node(0), "a", "0");
        store.add(node(2), "b", "2");
        let perm = NodePermutation::from_new_to_old(vec![node(2), node(1), node(0)]).unwrap();
        store.remap_nodes(&perm);
        assert_eq!(store.get_value(node(2), "a"), Some("0"));
        assert_eq!(store.get_value(node(0), "b"), Some("2"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn edge_keys_remap_both_ends() {
        let mut store = EdgeMetadata::new();
        let key = EdgeKey::new(node(0), node(1), SwitchId::from_raw(3));
        store.add(key, "fasm", "PIP");
        let perm = NodePermutation::from_new_to_old(vec![node(1), node(0)]).unwrap();
        store.remap_nodes(&perm);
        let moved = EdgeKey::new(node(1), node(0), SwitchId::from_raw(3));
        assert_eq!(store.get_value(moved, "fasm"), Some("PIP"));
        assert!(!store.contains_key(key));
    }

    #[test]
    fn remap_keys_merges_collisions() {
        let mut store = NodeMetadata::new();
        store.add(node(0), "a", "x");
        store.add(node(1), "b", "y");
        store.remap_keys(|_| node(5));
        let names: Vec<_> = store.get(node(5)).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn rekey_and_copy() {
        let mut store = NodeMetadata::new();
        store.add(node(0), "a", "x");
        store.copy_entries(node(0), node(4));
        assert_eq!(store.get_value(node(4), "a"), Some("x"));
        assert_eq!(store.get_value(node(0), "a"), Some("x"));

        store.rekey(node(0), node(7));
        assert!(!store.contains_key(node(0)));
        assert_eq!(store.get_value(node(7), "a"), Some("x"));

        store.copy_entries(node(9), node(1));
        assert!(!store.contains_key(node(1)));
    }

    #[test]
    fn references_within_checks_keys() {
        let mut store = EdgeMetadata::new();
        store.add(EdgeKey::new(node(0), node(3), SwitchId::from_raw(0)), "k", "v");
        assert!(store.references_within(4));
        assert!(!store.references_within(3));
    }

    #[test]
    fn serde_roundtrip() {
        let mut store = NodeMetadata::new();
        store.add(node(3), "name", "value");
        let json = serde_json::to_string(&store).unwrap();
        let back: NodeMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(store, back);
    }
}
