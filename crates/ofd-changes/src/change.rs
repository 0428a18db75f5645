//! Pending change records
//!
//! A [`Change`] is one pending edit against a single entity path. Create
//! and update changes carry a full snapshot of the entity (overlay is
//! substitution, never a field-level merge); updates additionally keep the
//! snapshot captured at the *first* edit, which anchors revert detection
//! and the audit-oriented property diff.

use chrono::{DateTime, Utc};
use ofd_catalog::{EntityKind, EntitySnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::path::EntityPath;

/// Kind of pending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Create,
    Update,
    Delete,
}

/// Identifier block of a change: which entity, where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityIdent {
    /// Entity kind
    #[serde(rename = "type")]
    pub kind: EntityKind,

    /// Canonical path of the node holding the change
    pub path: EntityPath,

    /// Identifier of the addressed entity (last path segment)
    pub id: String,
}

impl EntityIdent {
    /// Build the identifier block for a path
    #[must_use]
    pub fn for_path(path: &EntityPath) -> Self {
        Self {
            kind: path.kind(),
            path: path.clone(),
            id: path.leaf_id().to_string(),
        }
    }
}

/// One audited field-level difference, recomputed against the first-edit
/// snapshot on every refinement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property: String,
    pub old_value: Option<JsonValue>,
    pub new_value: Option<JsonValue>,
    pub timestamp: DateTime<Utc>,
}

/// A pending edit for exactly one entity path
///
/// # Invariants
/// - `entity.path` equals the path of the tree node holding the change
/// - `original_data`, once set, is never overwritten by later refinements
/// - at most one `Change` exists per path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Which entity this change targets
    pub entity: EntityIdent,

    /// Pending operation
    pub operation: ChangeOperation,

    /// Full entity snapshot (create/update)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EntitySnapshot>,

    /// Snapshot captured at the first edit (update only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_data: Option<EntitySnapshot>,

    /// Audit diff against `original_data`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_changes: Vec<PropertyChange>,

    /// When this change was last touched
    pub timestamp: DateTime<Utc>,

    /// Human-readable description for the change list
    pub description: String,
}

impl Change {
    /// Pending create with a full snapshot
    #[must_use]
    pub fn create(path: &EntityPath, data: EntitySnapshot, description: impl Into<String>) -> Self {
        Self {
            entity: EntityIdent::for_path(path),
            operation: ChangeOperation::Create,
            data: Some(data),
            original_data: None,
            property_changes: Vec::new(),
            timestamp: Utc::now(),
            description: description.into(),
        }
    }

    /// Pending update; `original` is the authoritative snapshot at first edit
    #[must_use]
    pub fn update(
        path: &EntityPath,
        original: EntitySnapshot,
        changed: EntitySnapshot,
        description: impl Into<String>,
    ) -> Self {
        let property_changes = diff_properties(&original, &changed);
        Self {
            entity: EntityIdent::for_path(path),
            operation: ChangeOperation::Update,
            data: Some(changed),
            original_data: Some(original),
            property_changes,
            timestamp: Utc::now(),
            description: description.into(),
        }
    }

    /// Pending delete
    #[must_use]
    pub fn delete(path: &EntityPath, description: impl Into<String>) -> Self {
        Self {
            entity: EntityIdent::for_path(path),
            operation: ChangeOperation::Delete,
            data: None,
            original_data: None,
            property_changes: Vec::new(),
            timestamp: Utc::now(),
            description: description.into(),
        }
    }

    /// Refine the pending snapshot with a later edit
    ///
    /// `original_data` stays anchored to the first edit; the property diff
    /// is recomputed against it from scratch.
    pub fn refine(&mut self, changed: EntitySnapshot, description: impl Into<String>) {
        if let Some(original) = &self.original_data {
            self.property_changes = diff_properties(original, &changed);
        }
        self.data = Some(changed);
        self.timestamp = Utc::now();
        self.description = description.into();
    }

    /// Whether a refinement fully reverts this update
    ///
    /// Compares whole snapshots against `original_data`, not the diff list.
    #[must_use]
    pub fn reverts_to_original(&self, changed: &EntitySnapshot) -> bool {
        self.original_data.as_ref() == Some(changed)
    }

    /// Rewrite only the location and identifier of this change
    ///
    /// Used by subtree moves: `operation`, `data`, `original_data`,
    /// `property_changes` and `timestamp` are never altered here.
    pub fn relocate(&mut self, new_path: &EntityPath) {
        self.entity = EntityIdent::for_path(new_path);
    }
}

/// Field-level diff between two snapshots
///
/// Union of property keys, strict JSON equality per key. Display-oriented
/// null/empty equivalence is intentionally not applied here.
#[must_use]
pub fn diff_properties(original: &EntitySnapshot, changed: &EntitySnapshot) -> Vec<PropertyChange> {
    let old_props = original.to_properties();
    let new_props = changed.to_properties();
    let now = Utc::now();

    let mut keys: Vec<&String> = old_props.keys().collect();
    for key in new_props.keys() {
        if !old_props.contains_key(key) {
            keys.push(key);
        }
    }

    let mut diffs = Vec::new();
    for key in keys {
        let old_value = old_props.get(key);
        let new_value = new_props.get(key);
        if old_value != new_value {
            diffs.push(PropertyChange {
                property: key.clone(),
                old_value: old_value.cloned(),
                new_value: new_value.cloned(),
                timestamp: now,
            });
        }
    }
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofd_catalog::EntityKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn brand(name: &str) -> EntitySnapshot {
        EntitySnapshot::from_value(
            EntityKind::Brand,
            json!({"id": "acme", "name": name}),
        )
        .unwrap()
    }

    #[test]
    fn ident_matches_path() {
        let path = EntityPath::material("b", "PLA");
        let ident = EntityIdent::for_path(&path);
        assert_eq!(ident.kind, EntityKind::Material);
        assert_eq!(ident.id, "PLA");
        assert_eq!(ident.path, path);
    }

    #[test]
    fn update_computes_property_diff() {
        let change = Change::update(
            &EntityPath::brand("acme"),
            brand("Acme"),
            brand("Acme Filaments"),
            "rename brand",
        );

        assert_eq!(change.property_changes.len(), 1);
        let diff = &change.property_changes[0];
        assert_eq!(diff.property, "name");
        assert_eq!(diff.old_value, Some(json!("Acme")));
        assert_eq!(diff.new_value, Some(json!("Acme Filaments")));
    }

    #[test]
    fn refine_keeps_original_anchored() {
        let first = brand("Acme");
        let mut change = Change::update(
            &EntityPath::brand("acme"),
            first.clone(),
            brand("Second"),
            "edit",
        );

        change.refine(brand("Third"), "edit again");

        assert_eq!(change.original_data, Some(first));
        assert_eq!(change.data, Some(brand("Third")));
        assert_eq!(change.property_changes.len(), 1);
        assert_eq!(
            change.property_changes[0].new_value,
            Some(json!("Third"))
        );
    }

    #[test]
    fn revert_detection_compares_snapshots() {
        let original = brand("Acme");
        let change = Change::update(
            &EntityPath::brand("acme"),
            original.clone(),
            brand("Edited"),
            "edit",
        );

        assert!(change.reverts_to_original(&original));
        assert!(!change.reverts_to_original(&brand("Edited")));
    }

    #[test]
    fn diff_covers_added_and_removed_properties() {
        let old = EntitySnapshot::from_value(
            EntityKind::Brand,
            json!({"id": "acme", "name": "Acme", "website": "https://a"}),
        )
        .unwrap();
        let new = EntitySnapshot::from_value(
            EntityKind::Brand,
            json!({"id": "acme", "name": "Acme", "logo": "acme.png"}),
        )
        .unwrap();

        let diffs = diff_properties(&old, &new);
        let props: Vec<&str> = diffs.iter().map(|d| d.property.as_str()).collect();
        assert!(props.contains(&"website"));
        assert!(props.contains(&"logo"));
        assert!(!props.contains(&"name"));
    }

    #[test]
    fn relocate_rewrites_only_identity() {
        let snapshot = brand("Acme");
        let mut change = Change::create(&EntityPath::brand("acme"), snapshot.clone(), "add");
        let before_ts = change.timestamp;

        change.relocate(&EntityPath::brand("acme-filaments"));

        assert_eq!(change.entity.id, "acme-filaments");
        assert_eq!(change.entity.path, EntityPath::brand("acme-filaments"));
        assert_eq!(change.data, Some(snapshot));
        assert_eq!(change.timestamp, before_ts);
        assert_eq!(change.operation, ChangeOperation::Create);
    }
}
