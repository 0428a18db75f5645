//! Rename redirects
//!
//! While a rename is pending, the host still serves the old name and users
//! may hold bookmarks to either. The ledger maps between the two until the
//! rename is submitted upstream.

use indexmap::IndexMap;
use ofd_changes::EntityPath;
use serde::{Deserialize, Serialize};

/// Bidirectional bookkeeping of pending renames
///
/// Chained renames collapse on insert: recording a→b and then b→c leaves a
/// single a→c entry, and renaming back to the origin clears the entry
/// entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameLedger {
    /// stale path string → current canonical path string
    forward: IndexMap<String, String>,
    /// current canonical path string → original path string
    backward: IndexMap<String, String>,
}

impl RenameLedger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed [`move_subtree`](ofd_changes::ChangeTree::move_subtree)
    pub fn record(&mut self, old: &EntityPath, new: &EntityPath) {
        let new_str = new.to_string();
        // If `old` was itself the target of an earlier rename, chain back to
        // the true origin.
        let origin = match self.backward.shift_remove(&old.to_string()) {
            Some(origin) => {
                self.forward.shift_remove(&origin);
                origin
            }
            None => old.to_string(),
        };

        if origin == new_str {
            // Renamed back to where it started: nothing left to redirect.
            return;
        }

        self.forward.insert(origin.clone(), new_str.clone());
        self.backward.insert(new_str, origin);
    }

    /// Resolve a possibly-stale path to its current canonical path
    ///
    /// Prefix-aware: a path under a renamed subtree redirects too. Returns
    /// `None` when no pending rename touches the path.
    #[must_use]
    pub fn resolve_current(&self, stale: &EntityPath) -> Option<EntityPath> {
        Self::rewrite(&self.forward, stale)
    }

    /// Resolve a current-named path back to the name upstream still serves
    #[must_use]
    pub fn resolve_original(&self, current: &EntityPath) -> Option<EntityPath> {
        Self::rewrite(&self.backward, current)
    }

    /// Whether any rename is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Pending renames as (original, current) path-string pairs
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward
            .iter()
            .map(|(origin, current)| (origin.as_str(), current.as_str()))
    }

    /// Drop all recorded renames (discard or post-submission reset)
    pub fn clear(&mut self) {
        self.forward.clear();
        self.backward.clear();
    }

    fn rewrite(map: &IndexMap<String, String>, path: &EntityPath) -> Option<EntityPath> {
        let path_str = path.to_string();
        for (from, to) in map {
            if path_str == *from {
                return to.parse().ok();
            }
            if path_str.len() > from.len()
                && path_str.starts_with(from.as_str())
                && path_str.as_bytes()[from.len()] == b'/'
            {
                let rewritten = format!("{to}{}", &path_str[from.len()..]);
                return rewritten.parse().ok();
            }
        }
        None
    }
}
