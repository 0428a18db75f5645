//! Editor session facade
//!
//! The entry points a host UI calls. Every tracking method runs the
//! per-path state machine (create/update/delete collapse rules), then
//! persists the whole change set to durable storage. Persistence failures
//! are logged and swallowed so an edit never disappears from the in-memory
//! session; image byte writes are the one exception and raise, because a
//! dangling reference would poison the eventual export.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use indexmap::IndexMap;
use tracing::warn;
use uuid::Uuid;

use ofd_catalog::EntitySnapshot;
use ofd_changes::{
    from_json, to_json, Change, ChangeOperation, EntityPath, ImageReference, TreeChangeSet,
};
use ofd_overlay::{overlay_entity, Overlaid, RenameLedger};

use crate::export::{ExportBundle, ExportImage, ExportMetadata};
use crate::kv::{DurableStore, StoreError};

/// Well-known key the change set persists under
pub const CHANGE_SET_KEY: &str = "ofd.changeset";

/// Well-known key the rename ledger persists under
///
/// Redirects must outlive the session that recorded them: a bookmark by
/// nature crosses reloads, so the ledger rides along with every persist
/// until the rename is submitted or discarded.
pub const REDIRECTS_KEY: &str = "ofd.redirects";

/// One editing session over a durable store
#[derive(Debug)]
pub struct EditorSession<S: DurableStore> {
    store: S,
    set: TreeChangeSet,
    ledger: RenameLedger,
}

impl<S: DurableStore> EditorSession<S> {
    /// Hydrate a session from `store`
    ///
    /// A missing change set starts empty; a corrupt or version-mismatched
    /// one is logged and discarded rather than blocking the session. The
    /// rename ledger is hydrated alongside the change set; without its
    /// changes a stale ledger is meaningless, so the fallback resets both.
    pub fn open(store: S) -> Result<Self, StoreError> {
        let (set, ledger) = match store.get(CHANGE_SET_KEY)? {
            None => (TreeChangeSet::new(), RenameLedger::new()),
            Some(raw) => match from_json(&raw) {
                Ok(set) => {
                    let ledger = Self::load_ledger(&store)?;
                    (set, ledger)
                }
                Err(err) => {
                    warn!(error = %err, "discarding unreadable change set");
                    (TreeChangeSet::new(), RenameLedger::new())
                }
            },
        };
        Ok(Self { store, set, ledger })
    }

    fn load_ledger(store: &S) -> Result<RenameLedger, StoreError> {
        let Some(raw) = store.get(REDIRECTS_KEY)? else {
            return Ok(RenameLedger::new());
        };
        match serde_json::from_str(&raw) {
            Ok(ledger) => Ok(ledger),
            Err(err) => {
                warn!(error = %err, "discarding unreadable rename ledger");
                Ok(RenameLedger::new())
            }
        }
    }

    /// The pending change set
    #[inline]
    #[must_use]
    pub fn changes(&self) -> &TreeChangeSet {
        &self.set
    }

    /// Pending rename redirects
    #[inline]
    #[must_use]
    pub fn redirects(&self) -> &RenameLedger {
        &self.ledger
    }

    /// The pending change at `path`, if any
    #[inline]
    #[must_use]
    pub fn get_change(&self, path: &EntityPath) -> Option<&Change> {
        self.set.get_change(&path.to_string())
    }

    /// Overlay `base` with the pending change at `path`
    #[must_use]
    pub fn overlaid(&self, path: &EntityPath, base: Option<EntitySnapshot>) -> Overlaid {
        overlay_entity(base, self.get_change(path))
    }

    /// Record a pending create at `path`
    pub fn track_create(
        &mut self,
        path: &EntityPath,
        snapshot: EntitySnapshot,
        description: impl Into<String>,
    ) {
        self.set
            .set_change(path, Change::create(path, snapshot, description));
        self.persist();
    }

    /// Record a pending update at `path`
    ///
    /// `original` is the authoritative snapshot and anchors revert
    /// detection: it is captured on the first edit only, later edits
    /// refine the pending snapshot against it, and an edit equal to it
    /// removes the change entirely.
    pub fn track_update(
        &mut self,
        path: &EntityPath,
        original: EntitySnapshot,
        changed: EntitySnapshot,
        description: impl Into<String>,
    ) {
        if self.apply_update(path, original, changed, description) {
            self.persist();
        }
    }

    /// Record a pending delete at `path`
    ///
    /// Deleting a pending create erases it instead; either way every
    /// descendant change goes, along with the subtree's image references
    /// and their stored bytes.
    pub fn track_delete(&mut self, path: &EntityPath, description: impl Into<String>) {
        let pending_create = matches!(
            self.get_change(path).map(|change| change.operation),
            Some(ChangeOperation::Create)
        );

        let mut removed = self.set.remove_descendants(path);
        if pending_create {
            self.set.remove_change(&path.to_string());
        } else {
            self.set.set_change(path, Change::delete(path, description));
        }
        removed
            .images
            .extend(self.set.remove_images_at_or_under(path));
        self.drop_image_bytes(&removed.images);
        self.persist();
    }

    /// Record a rename: an update capturing the identifier change, then
    /// the subtree move and a redirect entry
    pub fn track_rename(
        &mut self,
        old: &EntityPath,
        new: &EntityPath,
        original: EntitySnapshot,
        renamed: EntitySnapshot,
        description: impl Into<String>,
    ) {
        self.apply_update(old, original, renamed, description);
        self.set.move_subtree(old, new);
        self.ledger.record(old, new);
        self.persist();
    }

    /// Store image bytes and register the reference
    ///
    /// The byte write must succeed before the reference exists anywhere;
    /// a failure raises and leaves the session untouched.
    pub fn store_image(
        &mut self,
        path: &EntityPath,
        property: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Result<ImageReference, StoreError> {
        let reference =
            ImageReference::for_upload(path.clone(), property, filename, mime_type, bytes);
        self.store
            .put(&reference.storage_key, &STANDARD.encode(bytes))?;
        self.set.add_image(reference.clone());
        self.persist();
        Ok(reference)
    }

    /// Remove a pending image and its stored bytes
    pub fn remove_image(&mut self, id: &Uuid) -> Option<ImageReference> {
        let removed = self.set.remove_image(id)?;
        self.drop_image_bytes(std::slice::from_ref(&removed));
        self.persist();
        Some(removed)
    }

    /// Decoded bytes for a registered image
    ///
    /// `Ok(None)` for an unknown id; a registered reference whose bytes
    /// are gone or undecodable is an error.
    pub fn image_bytes(&self, id: &Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(reference) = self.set.images().get(id) else {
            return Ok(None);
        };
        let encoded = self.load_image_payload(&reference.storage_key)?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| StoreError::ImageBytes {
                key: reference.storage_key.clone(),
            })?;
        Ok(Some(bytes))
    }

    /// Drop every pending change, image and redirect
    pub fn discard_all(&mut self) {
        let keys: Vec<String> = self
            .set
            .images()
            .iter()
            .map(|reference| reference.storage_key.clone())
            .collect();
        self.set.clear();
        self.ledger.clear();

        for key in keys {
            if let Err(err) = self.store.delete(&key) {
                warn!(%key, error = %err, "failed to delete image bytes");
            }
        }
        if let Err(err) = self.store.delete(CHANGE_SET_KEY) {
            warn!(error = %err, "failed to delete persisted change set");
        }
        if let Err(err) = self.store.delete(REDIRECTS_KEY) {
            warn!(error = %err, "failed to delete persisted rename ledger");
        }
    }

    /// Bundle everything pending for the submission pipeline
    ///
    /// Errors if any registered image has lost its bytes (invariant: a
    /// reference without a payload must never reach export).
    pub fn export_bundle(&self) -> Result<ExportBundle, StoreError> {
        let mut images = IndexMap::new();
        for reference in self.set.images().iter() {
            let data = self.load_image_payload(&reference.storage_key)?;
            images.insert(
                reference.id,
                ExportImage {
                    filename: reference.filename.clone(),
                    mime_type: reference.mime_type.clone(),
                    data,
                },
            );
        }

        Ok(ExportBundle {
            metadata: ExportMetadata {
                generated_at: Utc::now(),
                change_count: self.set.change_count(),
                version: self.set.version(),
            },
            changes: self.set.all_changes().into_iter().cloned().collect(),
            images,
        })
    }

    /// Persist the change set and rename ledger, logging failures instead
    /// of surfacing them
    ///
    /// The in-memory session stays authoritative; the next successful
    /// persist catches storage up.
    pub fn persist(&mut self) {
        match to_json(&self.set) {
            Ok(json) => {
                if let Err(err) = self.store.put(CHANGE_SET_KEY, &json) {
                    warn!(error = %err, "failed to persist change set");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize change set"),
        }
        match serde_json::to_string(&self.ledger) {
            Ok(json) => {
                if let Err(err) = self.store.put(REDIRECTS_KEY, &json) {
                    warn!(error = %err, "failed to persist rename ledger");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize rename ledger"),
        }
    }

    /// State machine for updates; returns whether the set was touched
    fn apply_update(
        &mut self,
        path: &EntityPath,
        original: EntitySnapshot,
        changed: EntitySnapshot,
        description: impl Into<String>,
    ) -> bool {
        let key = path.to_string();
        let Some(existing) = self.set.get_change(&key).cloned() else {
            if changed == original {
                // Editing back to the authoritative state with nothing
                // pending is a no-op.
                return false;
            }
            self.set
                .set_change(path, Change::update(path, original, changed, description));
            return true;
        };

        match existing.operation {
            // A create has no upstream original; later edits refine it and
            // it stays a create.
            ChangeOperation::Create => {
                let mut change = existing;
                change.refine(changed, description);
                self.set.set_change(path, change);
            }
            ChangeOperation::Update => {
                if existing.reverts_to_original(&changed) {
                    self.set.remove_change(&key);
                } else {
                    let mut change = existing;
                    change.refine(changed, description);
                    self.set.set_change(path, change);
                }
            }
            // Editing a deleted entity resurrects it as an update.
            ChangeOperation::Delete => {
                self.set
                    .set_change(path, Change::update(path, original, changed, description));
            }
        }
        true
    }

    fn load_image_payload(&self, storage_key: &str) -> Result<String, StoreError> {
        self.store
            .get(storage_key)?
            .ok_or_else(|| StoreError::ImageBytes {
                key: storage_key.to_string(),
            })
    }

    /// Delete stored bytes for removed references, keeping any payload a
    /// surviving reference still shares
    fn drop_image_bytes(&mut self, removed: &[ImageReference]) {
        for reference in removed {
            let still_used = self
                .set
                .images()
                .iter()
                .any(|live| live.storage_key == reference.storage_key);
            if still_used {
                continue;
            }
            if let Err(err) = self.store.delete(&reference.storage_key) {
                warn!(key = %reference.storage_key, error = %err, "failed to delete image bytes");
            }
        }
    }
}
