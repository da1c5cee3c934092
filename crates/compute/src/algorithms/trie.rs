//! Prefix tree over high-level event paths.
//!
//! Inserting every enumerated path and reading back the root-to-leaf
//! chains discards exactly the paths that are strict prefixes of another
//! inserted path.

use std::collections::BTreeMap;

use stau_core::HleId;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: BTreeMap<HleId, TrieNode>,
}

/// Trie keyed by event id, children ordered for deterministic traversal.
#[derive(Debug, Clone, Default)]
pub struct PathTrie {
    root: TrieNode,
}

impl PathTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &[HleId]) {
        let mut node = &mut self.root;
        for &id in path {
            node = node.children.entry(id).or_default();
        }
    }

    /// Every maximal inserted path, in child-id order.
    ///
    /// A chain ends at a leaf exactly when no longer insertion passed
    /// through it, so interior chains (strict prefixes) never come back.
    pub fn leaves(&self) -> Vec<Vec<HleId>> {
        let mut paths = Vec::new();
        let mut chain = Vec::new();
        collect_leaves(&self.root, &mut chain, &mut paths);
        paths
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}

fn collect_leaves(node: &TrieNode, chain: &mut Vec<HleId>, paths: &mut Vec<Vec<HleId>>) {
    if node.children.is_empty() {
        if !chain.is_empty() {
            paths.push(chain.clone());
        }
        return;
    }
    for (&id, child) in &node.children {
        chain.push(id);
        collect_leaves(child, chain, paths);
        chain.pop();
    }
}
