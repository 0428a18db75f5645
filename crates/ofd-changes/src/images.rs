//! Image reference bookkeeping
//!
//! References are metadata only; the raw bytes live in durable storage
//! under each reference's own `storage_key`, keeping the primary persisted
//! document small. Keys are content-addressed (Blake3 of the payload), so
//! identical bytes share a slot.
//!
//! Every reference's `entity_path` must equal, or lie under, some
//! addressable node's path; subtree moves and deletes keep that true by
//! relocating or dropping references together with their subtree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::ContentHash;
use crate::path::EntityPath;

/// Metadata for one pending image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Registry id
    pub id: Uuid,

    /// Entity the image belongs to
    pub entity_path: EntityPath,

    /// Entity property the image fills (`logo`, ...)
    pub property: String,

    /// Original upload filename
    pub filename: String,

    /// MIME type of the payload
    pub mime_type: String,

    /// Durable-storage key holding the base64 bytes
    pub storage_key: String,
}

impl ImageReference {
    /// Build a reference for an upload, deriving the storage key from the
    /// payload hash
    #[must_use]
    pub fn for_upload(
        entity_path: EntityPath,
        property: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_path,
            property: property.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            storage_key: storage_key_for(bytes),
        }
    }
}

/// Durable-storage key for an image payload
#[must_use]
pub(crate) fn storage_key_for(bytes: &[u8]) -> String {
    format!("ofd.image.{}", ContentHash::compute(bytes).short())
}

/// Registry of pending image references, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRegistry {
    refs: IndexMap<Uuid, ImageReference>,
}

impl ImageRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reference
    pub fn insert(&mut self, reference: ImageReference) {
        self.refs.insert(reference.id, reference);
    }

    /// Look up by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<&ImageReference> {
        self.refs.get(id)
    }

    /// Remove by id, returning the reference
    pub fn remove(&mut self, id: &Uuid) -> Option<ImageReference> {
        self.refs.shift_remove(id)
    }

    /// References whose entity path equals or lies under `path`
    #[must_use]
    pub fn at_or_under(&self, path: &EntityPath) -> Vec<&ImageReference> {
        self.refs
            .values()
            .filter(|reference| reference.entity_path.is_at_or_under(path))
            .collect()
    }

    /// Remove and return every reference at or under `path`
    pub fn remove_at_or_under(&mut self, path: &EntityPath) -> Vec<ImageReference> {
        let ids: Vec<Uuid> = self
            .refs
            .values()
            .filter(|reference| reference.entity_path.is_at_or_under(path))
            .map(|reference| reference.id)
            .collect();
        ids.iter()
            .filter_map(|id| self.refs.shift_remove(id))
            .collect()
    }

    /// Rewrite `entity_path` for every reference at or under `old`
    ///
    /// Only the path prefix changes; id, property, filename, MIME type and
    /// storage key stay untouched. Returns the number of moved references.
    pub fn move_prefix(&mut self, old: &EntityPath, new: &EntityPath) -> usize {
        let mut moved = 0;
        for reference in self.refs.values_mut() {
            if let Some(rebased) = reference.entity_path.rebase(old, new) {
                reference.entity_path = rebased;
                moved += 1;
            }
        }
        moved
    }

    /// All references in registration order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ImageReference> {
        self.refs.values()
    }

    /// Number of references
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Whether the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reference(path: EntityPath) -> ImageReference {
        ImageReference::for_upload(path, "logo", "logo.png", "image/png", b"png bytes")
    }

    #[test]
    fn storage_key_is_content_addressed() {
        let a = reference(EntityPath::brand("a"));
        let b = reference(EntityPath::brand("b"));
        // Same bytes, same slot; distinct registry ids.
        assert_eq!(a.storage_key, b.storage_key);
        assert_ne!(a.id, b.id);
        assert!(a.storage_key.starts_with("ofd.image."));
    }

    #[test]
    fn at_or_under_matches_prefix() {
        let mut registry = ImageRegistry::new();
        registry.insert(reference(EntityPath::brand("b")));
        registry.insert(reference(EntityPath::material("b", "PLA")));
        registry.insert(reference(EntityPath::brand("other")));

        assert_eq!(registry.at_or_under(&EntityPath::brand("b")).len(), 2);
        assert_eq!(
            registry.at_or_under(&EntityPath::material("b", "PLA")).len(),
            1
        );
    }

    #[test]
    fn move_prefix_rewrites_only_paths() {
        let mut registry = ImageRegistry::new();
        let original = reference(EntityPath::material("b", "PLA"));
        let key = original.storage_key.clone();
        let id = original.id;
        registry.insert(original);
        registry.insert(reference(EntityPath::brand("other")));

        let moved = registry.move_prefix(
            &EntityPath::material("b", "PLA"),
            &EntityPath::material("b", "PETG"),
        );

        assert_eq!(moved, 1);
        let reference = registry.get(&id).unwrap();
        assert_eq!(reference.entity_path, EntityPath::material("b", "PETG"));
        assert_eq!(reference.storage_key, key);
    }

    #[test]
    fn remove_at_or_under_returns_removed() {
        let mut registry = ImageRegistry::new();
        registry.insert(reference(EntityPath::variant("b", "PLA", "f", "red")));
        registry.insert(reference(EntityPath::brand("other")));

        let removed = registry.remove_at_or_under(&EntityPath::brand("b"));

        assert_eq!(removed.len(), 1);
        assert_eq!(registry.len(), 1);
    }
}
