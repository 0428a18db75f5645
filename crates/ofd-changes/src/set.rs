//! The tree change set: tree + images + persistence metadata
//!
//! One [`TreeChangeSet`] is the whole editing session's pending state.
//! Every mutating call bumps `last_modified`; the session layer persists
//! after each mutation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::change::Change;
use crate::images::{ImageReference, ImageRegistry};
use crate::path::EntityPath;
use crate::serial::CHANGE_SET_VERSION;
use crate::tree::{ChangeTree, ChangeTreeNode};

/// Everything removed by a subtree-clearing operation, for caller-side
/// cleanup (deleting stored image bytes)
#[derive(Debug, Default)]
pub struct RemovedSubtree {
    pub changes: Vec<Change>,
    pub images: Vec<ImageReference>,
}

/// Tree of pending changes plus the image registry and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TreeChangeSet {
    tree: ChangeTree,
    images: ImageRegistry,
    last_modified: DateTime<Utc>,
    version: u32,
}

impl Default for TreeChangeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeChangeSet {
    /// Empty change set at the current version
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: ChangeTree::new(),
            images: ImageRegistry::new(),
            last_modified: Utc::now(),
            version: CHANGE_SET_VERSION,
        }
    }

    pub(crate) fn from_parts(
        tree: ChangeTree,
        images: ImageRegistry,
        last_modified: DateTime<Utc>,
        version: u32,
    ) -> Self {
        Self {
            tree,
            images,
            last_modified,
            version,
        }
    }

    /// The change tree (read-only; mutate through the set)
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &ChangeTree {
        &self.tree
    }

    /// The image registry (read-only; mutate through the set)
    #[inline]
    #[must_use]
    pub fn images(&self) -> &ImageRegistry {
        &self.images
    }

    /// When the set was last mutated
    #[inline]
    #[must_use]
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Persisted-format version
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// O(1) change lookup by path string
    #[inline]
    #[must_use]
    pub fn get_change(&self, path: &str) -> Option<&Change> {
        self.tree.get_change(path)
    }

    /// Direct pending children of `parent` under its child namespace
    #[inline]
    #[must_use]
    pub fn direct_children(&self, parent: &EntityPath) -> Vec<&ChangeTreeNode> {
        self.tree.get_direct_children(parent)
    }

    /// Assign a change at `path`, creating nodes as needed
    pub fn set_change(&mut self, path: &EntityPath, change: Change) {
        self.tree.set_change(path, change);
        self.touch();
    }

    /// Remove the change at `path`, pruning empty structure upward
    pub fn remove_change(&mut self, path: &str) -> Option<Change> {
        let removed = self.tree.remove_change(path);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Delete every child subtree of `path`, keeping the node and its change
    ///
    /// Image references strictly below `path` are dropped with their
    /// subtrees and returned for byte cleanup.
    pub fn remove_descendants(&mut self, path: &EntityPath) -> RemovedSubtree {
        let changes = self.tree.remove_descendants(&path.to_string());
        let images = self.remove_images_strictly_under(path);
        if !changes.is_empty() || !images.is_empty() {
            self.touch();
        }
        RemovedSubtree { changes, images }
    }

    /// Relocate the subtree at `old` to `new`, images included
    pub fn move_subtree(&mut self, old: &EntityPath, new: &EntityPath) -> usize {
        let moved_changes = self.tree.move_subtree(old, new);
        let moved_images = self.images.move_prefix(old, new);
        if moved_changes > 0 || moved_images > 0 {
            self.touch();
        }
        moved_changes
    }

    /// Register a pending image
    pub fn add_image(&mut self, reference: ImageReference) {
        self.images.insert(reference);
        self.touch();
    }

    /// Remove a pending image by id
    pub fn remove_image(&mut self, id: &Uuid) -> Option<ImageReference> {
        let removed = self.images.remove(id);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Remove and return every image reference at or under `path`
    pub fn remove_images_at_or_under(&mut self, path: &EntityPath) -> Vec<ImageReference> {
        let removed = self.images.remove_at_or_under(path);
        if !removed.is_empty() {
            self.touch();
        }
        removed
    }

    fn remove_images_strictly_under(&mut self, path: &EntityPath) -> Vec<ImageReference> {
        let mut removed = self.images.remove_at_or_under(path);
        // The node itself survives remove_descendants; its own images stay.
        let mut kept = Vec::new();
        removed.retain(|reference| {
            if reference.entity_path == *path {
                kept.push(reference.clone());
                false
            } else {
                true
            }
        });
        for reference in kept {
            self.images.insert(reference);
        }
        removed
    }

    /// Flat list of all pending changes, depth-first from the roots
    #[inline]
    #[must_use]
    pub fn all_changes(&self) -> Vec<&Change> {
        self.tree.all_changes()
    }

    /// Number of pending changes
    #[inline]
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.tree.change_count()
    }

    /// Whether nothing is pending (no changes and no images)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty() && self.images.is_empty()
    }

    /// Drop all pending state (discard or post-submission reset)
    pub fn clear(&mut self) {
        self.tree = ChangeTree::new();
        self.images = ImageRegistry::new();
        self.touch();
    }

    fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofd_catalog::{EntityKind, EntitySnapshot};
    use serde_json::json;

    fn brand_snapshot(id: &str) -> EntitySnapshot {
        EntitySnapshot::from_value(EntityKind::Brand, json!({"id": id})).unwrap()
    }

    fn image_at(path: EntityPath) -> ImageReference {
        ImageReference::for_upload(path, "logo", "logo.png", "image/png", b"bytes")
    }

    #[test]
    fn mutations_bump_last_modified() {
        let mut set = TreeChangeSet::new();
        let before = set.last_modified();

        let path = EntityPath::brand("b");
        set.set_change(&path, Change::create(&path, brand_snapshot("b"), "add"));

        assert!(set.last_modified() >= before);
        assert_eq!(set.change_count(), 1);
    }

    #[test]
    fn remove_descendants_keeps_own_images() {
        let mut set = TreeChangeSet::new();
        let brand = EntityPath::brand("b");
        let material = EntityPath::material("b", "PLA");

        set.set_change(&brand, Change::create(&brand, brand_snapshot("b"), "add"));
        let deep = Change::delete(&material, "del");
        set.set_change(&material, deep);
        set.add_image(image_at(brand.clone()));
        set.add_image(image_at(material.clone()));

        let removed = set.remove_descendants(&brand);

        assert_eq!(removed.changes.len(), 1);
        assert_eq!(removed.images.len(), 1);
        // Brand's own image survives; the material's went with its subtree.
        assert_eq!(set.images().len(), 1);
        assert_eq!(set.images().at_or_under(&brand).len(), 1);
    }

    #[test]
    fn move_subtree_carries_images() {
        let mut set = TreeChangeSet::new();
        let old = EntityPath::material("b", "PLA");
        let new = EntityPath::material("b", "PETG");

        let change = Change::delete(&old, "del");
        set.set_change(&old, change);
        set.add_image(image_at(old.clone()));

        set.move_subtree(&old, &new);

        assert!(set.get_change("brands/b/materials/PETG").is_some());
        assert_eq!(set.images().at_or_under(&new).len(), 1);
        assert!(set.images().at_or_under(&old).is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let mut set = TreeChangeSet::new();
        let path = EntityPath::brand("b");
        set.set_change(&path, Change::create(&path, brand_snapshot("b"), "add"));
        set.add_image(image_at(path));

        set.clear();

        assert!(set.is_empty());
    }
}
