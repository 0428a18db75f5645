//! Subtree relocation (renames)
//!
//! Renaming an entity moves its whole subtree: the change at the renamed
//! path plus every descendant change shift to the new prefix, keeping each
//! relative suffix byte-identical. Only location and identifier are
//! rewritten: operation, snapshots, property diffs and timestamps travel
//! untouched.

use crate::change::Change;
use crate::path::EntityPath;
use crate::tree::ChangeTree;

impl ChangeTree {
    /// Relocate the node at `old` and all its descendants to `new`
    ///
    /// A rename keeps the entity's kind, so `old` and `new` must address
    /// the same hierarchy level; a cross-kind pair is rejected as a no-op
    /// before anything is lifted out of the tree. Also a no-op when the
    /// paths are equal or nothing exists at `old`. Structural remnants at
    /// the old location are pruned with the same rule as
    /// [`ChangeTree::remove_change`]. Returns the number of relocated
    /// changes.
    pub fn move_subtree(&mut self, old: &EntityPath, new: &EntityPath) -> usize {
        if old == new || old.kind() != new.kind() {
            return 0;
        }
        let old_str = old.to_string();
        if self.get(&old_str).is_none() {
            return 0;
        }

        // Lift every change out of the old subtree, remembering where each
        // one lived relative to the moved root.
        let mut lifted: Vec<(String, Change)> = Vec::new();
        for subtree_path in self.subtree_paths(&old_str) {
            if let Some(change) = self.get(&subtree_path).and_then(|node| node.change()) {
                let change = change.clone();
                lifted.push((subtree_path, change));
            }
        }

        self.remove_subtree(&old_str);

        let mut moved = 0;
        for (old_path, mut change) in lifted {
            let suffix = &old_path[old_str.len()..];
            let rewritten = format!("{new}{suffix}");
            // The kind guard above makes every rewrite reparse: a failure
            // here would mean the tree held an unaddressable node, which
            // ensure_node never creates.
            if let Ok(new_path) = rewritten.parse::<EntityPath>() {
                change.relocate(&new_path);
                self.set_change(&new_path, change);
                moved += 1;
            }
        }
        moved
    }
}
