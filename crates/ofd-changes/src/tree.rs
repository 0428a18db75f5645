//! The change tree and its derived path index
//!
//! Nodes are stored in one flat map keyed by canonical path string; that
//! map *is* the derived index, giving O(1) [`ChangeTree::get_change`]. The
//! tree shape lives in per-node child segment sets plus the two root
//! namespace sets; [`ChangeTree::get_node`] walks those links without
//! consulting the flat map's key set, which is what lets tests cross-check
//! the index against the walkable tree.
//!
//! Invariants maintained by every mutation:
//! - the flat map's key set equals the set of paths reachable by walking
//!   the root sets and child links
//! - a structural node with no change and no children is removed
//!   immediately (upward pruning)
//! - a change's `entity.path` equals the path of the node holding it

use indexmap::{IndexMap, IndexSet};

use crate::change::Change;
use crate::path::{EntityPath, RootNamespace};

/// One node of the change tree
///
/// Nodes without a change are purely structural: namespace containers
/// such as `materials`, or ancestors kept alive by edited descendants.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeTreeNode {
    key: String,
    path: String,
    change: Option<Change>,
    children: IndexSet<String>,
}

impl ChangeTreeNode {
    fn structural(key: String, path: String) -> Self {
        Self {
            key,
            path,
            change: None,
            children: IndexSet::new(),
        }
    }

    /// Last path segment of this node
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Canonical path string of this node
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Pending change held by this node, if any
    #[inline]
    #[must_use]
    pub fn change(&self) -> Option<&Change> {
        self.change.as_ref()
    }

    /// Whether this node exists only to hold children
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        self.change.is_none()
    }

    /// Child segments in insertion order
    #[inline]
    pub fn child_segments(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }
}

/// Tree of pending changes with two root namespaces (`stores`, `brands`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeTree {
    stores: IndexSet<String>,
    brands: IndexSet<String>,
    nodes: IndexMap<String, ChangeTreeNode>,
}

impl ChangeTree {
    /// Empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn roots(&self, namespace: RootNamespace) -> &IndexSet<String> {
        match namespace {
            RootNamespace::Stores => &self.stores,
            RootNamespace::Brands => &self.brands,
        }
    }

    fn roots_mut(&mut self, namespace: RootNamespace) -> &mut IndexSet<String> {
        match namespace {
            RootNamespace::Stores => &mut self.stores,
            RootNamespace::Brands => &mut self.brands,
        }
    }

    /// Idempotently create every node along `path`, returning the leaf
    ///
    /// Each newly created node is registered in the index as it is linked
    /// into its parent; calling this twice for the same path finds the
    /// first call's nodes.
    pub fn ensure_node(&mut self, path: &EntityPath) -> &mut ChangeTreeNode {
        let segments = path.segments();
        let depth = segments.len();

        for level in 2..=depth {
            let segment = segments[level - 1];
            if level == 2 {
                self.roots_mut(path.namespace()).insert(segment.to_string());
            } else {
                let parent_path = segments[..level - 1].join("/");
                if let Some(parent) = self.nodes.get_mut(&parent_path) {
                    parent.children.insert(segment.to_string());
                }
            }
            if level < depth {
                let node_path = segments[..level].join("/");
                let key = segment.to_string();
                let path_copy = node_path.clone();
                self.nodes
                    .entry(node_path)
                    .or_insert_with(|| ChangeTreeNode::structural(key, path_copy));
            }
        }

        let leaf_path = segments.join("/");
        let leaf_key = segments[depth - 1].to_string();
        let path_copy = leaf_path.clone();
        self.nodes
            .entry(leaf_path)
            .or_insert_with(|| ChangeTreeNode::structural(leaf_key, path_copy))
    }

    /// O(1) index lookup of a node
    #[inline]
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ChangeTreeNode> {
        self.nodes.get(path)
    }

    /// Pure tree walk from the roots, independent of the index key set
    ///
    /// Follows the root sets and child links segment by segment; a node
    /// only reachable through the flat map but not through links (or vice
    /// versa) is an invariant violation this lookup exposes.
    #[must_use]
    pub fn get_node(&self, path: &str) -> Option<&ChangeTreeNode> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 2 {
            return None;
        }
        let namespace = match segments[0] {
            "stores" => RootNamespace::Stores,
            "brands" => RootNamespace::Brands,
            _ => return None,
        };
        if !self.roots(namespace).contains(segments[1]) {
            return None;
        }

        let mut current = segments[..2].join("/");
        for segment in &segments[2..] {
            let node = self.nodes.get(&current)?;
            if !node.children.contains(*segment) {
                return None;
            }
            current.push('/');
            current.push_str(segment);
        }
        self.nodes.get(&current)
    }

    /// O(1) change lookup by path string
    #[inline]
    #[must_use]
    pub fn get_change(&self, path: &str) -> Option<&Change> {
        self.nodes.get(path).and_then(ChangeTreeNode::change)
    }

    /// Ensure the node at `path` and assign `change` to it
    ///
    /// At most one change exists per path; a prior change is replaced.
    pub fn set_change(&mut self, path: &EntityPath, change: Change) {
        let node = self.ensure_node(path);
        node.change = Some(change);
    }

    /// Remove the change at `path`, pruning now-empty structural ancestors
    ///
    /// Walks upward deleting nodes that hold neither a change nor children,
    /// stopping at the first ancestor that still earns its place. Safe
    /// no-op when nothing exists at `path`.
    pub fn remove_change(&mut self, path: &str) -> Option<Change> {
        let node = self.nodes.get_mut(path)?;
        let removed = node.change.take();
        self.prune_upward(path);
        removed
    }

    /// Immediate children of `parent` under its child namespace
    ///
    /// Cost is proportional to the branching factor at the container node,
    /// never to the total number of pending changes.
    #[must_use]
    pub fn get_direct_children(&self, parent: &EntityPath) -> Vec<&ChangeTreeNode> {
        let Some(namespace) = parent.kind().child_namespace() else {
            return Vec::new();
        };
        let container_path = format!("{parent}/{namespace}");
        let Some(container) = self.nodes.get(&container_path) else {
            return Vec::new();
        };
        container
            .children
            .iter()
            .filter_map(|segment| self.nodes.get(&format!("{container_path}/{segment}")))
            .collect()
    }

    /// Top-level children of a root namespace (all pending stores/brands)
    #[must_use]
    pub fn root_children(&self, namespace: RootNamespace) -> Vec<&ChangeTreeNode> {
        self.roots(namespace)
            .iter()
            .filter_map(|segment| self.nodes.get(&format!("{}/{segment}", namespace.as_str())))
            .collect()
    }

    /// Every change strictly below `path`, depth-first, excluding the node
    #[must_use]
    pub fn collect_descendant_changes(&self, path: &str) -> Vec<&Change> {
        let mut changes = Vec::new();
        for descendant in self.descendant_paths(path) {
            if let Some(change) = self.nodes.get(&descendant).and_then(ChangeTreeNode::change) {
                changes.push(change);
            }
        }
        changes
    }

    /// Whether any change exists strictly below `path`
    ///
    /// Detects a change arbitrarily deep through purely structural
    /// intermediates; false when everything below is structural.
    #[must_use]
    pub fn has_descendant_changes(&self, path: &str) -> bool {
        let Some(node) = self.nodes.get(path) else {
            return false;
        };
        let mut stack: Vec<String> = node
            .children
            .iter()
            .map(|segment| format!("{path}/{segment}"))
            .collect();
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            if node.change.is_some() {
                return true;
            }
            stack.extend(
                node.children
                    .iter()
                    .map(|segment| format!("{current}/{segment}")),
            );
        }
        false
    }

    /// Delete every child subtree of `path`, preserving the node itself
    ///
    /// The node's own change is untouched. Returns every removed change so
    /// the caller can clean up associated state (pending images).
    pub fn remove_descendants(&mut self, path: &str) -> Vec<Change> {
        let descendants = self.descendant_paths(path);
        let mut removed = Vec::new();
        for descendant in &descendants {
            if let Some(mut node) = self.nodes.shift_remove(descendant) {
                if let Some(change) = node.change.take() {
                    removed.push(change);
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(path) {
            node.children.clear();
        }
        removed
    }

    /// All pending changes, depth-first from the roots (stores then brands)
    #[must_use]
    pub fn all_changes(&self) -> Vec<&Change> {
        let mut changes = Vec::new();
        for namespace in [RootNamespace::Stores, RootNamespace::Brands] {
            for segment in self.roots(namespace) {
                let top = format!("{}/{segment}", namespace.as_str());
                if let Some(change) = self.nodes.get(&top).and_then(ChangeTreeNode::change) {
                    changes.push(change);
                }
                changes.extend(self.collect_descendant_changes(&top));
            }
        }
        changes
    }

    /// Number of pending changes
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| node.change.is_some())
            .count()
    }

    /// Whether no changes are pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node path reachable by walking links from the roots
    ///
    /// Equals the index key set whenever the tree is consistent; exposed
    /// so tests can assert the invariant after arbitrary mutations.
    #[must_use]
    pub fn reachable_paths(&self) -> Vec<String> {
        let mut reachable = Vec::new();
        for namespace in [RootNamespace::Stores, RootNamespace::Brands] {
            for segment in self.roots(namespace) {
                let top = format!("{}/{segment}", namespace.as_str());
                reachable.push(top.clone());
                reachable.extend(self.descendant_paths(&top));
            }
        }
        reachable
    }

    /// Cross-check the flat index against the walkable tree
    #[must_use]
    pub fn index_matches_tree(&self) -> bool {
        let mut reachable = self.reachable_paths();
        reachable.sort();
        let mut indexed: Vec<String> = self.nodes.keys().cloned().collect();
        indexed.sort();
        reachable == indexed
    }

    /// Paths of `path` and every descendant, depth-first (`path` first)
    pub(crate) fn subtree_paths(&self, path: &str) -> Vec<String> {
        if !self.nodes.contains_key(path) {
            return Vec::new();
        }
        let mut paths = vec![path.to_string()];
        paths.extend(self.descendant_paths(path));
        paths
    }

    /// Paths strictly below `path`, depth-first
    fn descendant_paths(&self, path: &str) -> Vec<String> {
        let Some(node) = self.nodes.get(path) else {
            return Vec::new();
        };
        let mut paths = Vec::new();
        let mut stack: Vec<String> = node
            .children
            .iter()
            .rev()
            .map(|segment| format!("{path}/{segment}"))
            .collect();
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .map(|segment| format!("{current}/{segment}")),
            );
            paths.push(current);
        }
        paths
    }

    /// Remove `path` and everything below it, detaching and pruning upward
    pub(crate) fn remove_subtree(&mut self, path: &str) {
        for subtree_path in self.subtree_paths(path) {
            self.nodes.shift_remove(&subtree_path);
        }
        self.detach_from_parent(path);
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() > 2 {
            let parent = segments[..segments.len() - 1].join("/");
            self.prune_upward(&parent);
        }
    }

    /// Delete upward while nodes hold neither change nor children
    fn prune_upward(&mut self, start: &str) {
        let mut current = start.to_string();
        loop {
            let Some(node) = self.nodes.get(&current) else {
                return;
            };
            if node.change.is_some() || !node.children.is_empty() {
                return;
            }
            self.nodes.shift_remove(&current);
            self.detach_from_parent(&current);

            let segments: Vec<&str> = current.split('/').collect();
            if segments.len() == 2 {
                return;
            }
            current = segments[..segments.len() - 1].join("/");
        }
    }

    fn detach_from_parent(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 2 {
            return;
        }
        let leaf = segments[segments.len() - 1];
        if segments.len() == 2 {
            match segments[0] {
                "stores" => self.stores.shift_remove(leaf),
                _ => self.brands.shift_remove(leaf),
            };
        } else {
            let parent = segments[..segments.len() - 1].join("/");
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.shift_remove(leaf);
            }
        }
    }

    // Used by the serializer's index rebuild: insert a node restored from
    // the persisted nested form.
    pub(crate) fn restore_node(&mut self, path: &EntityPath, change: Option<Change>) {
        let node = self.ensure_node(path);
        node.change = change;
    }
}
