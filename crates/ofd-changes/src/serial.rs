//! Persisted form of the change set
//!
//! The durable blob is one JSON document: the nested change tree, the
//! image registry, the last-modified stamp and a format version. The
//! derived index is never persisted; deserialization rebuilds it from
//! scratch by walking the restored tree once, so the index/tree invariant
//! holds immediately no matter how the input JSON was produced.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::change::Change;
use crate::images::ImageRegistry;
use crate::path::{EntityPath, RootNamespace};
use crate::set::TreeChangeSet;
use crate::tree::ChangeTree;

/// Version tag written into every persisted blob
pub const CHANGE_SET_VERSION: u32 = 2;

/// One node of the persisted nested tree
///
/// Paths are not stored; they are derived from position during the index
/// rebuild on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedNode {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Change>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, PersistedNode>,
}

/// The two persisted root namespaces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedTree {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub stores: IndexMap<String, PersistedNode>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub brands: IndexMap<String, PersistedNode>,
}

/// The whole persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedChangeSet {
    pub tree: PersistedTree,

    #[serde(default)]
    pub images: ImageRegistry,

    pub last_modified: DateTime<Utc>,

    pub version: u32,
}

/// Convert a live change set into its persisted nested form
#[must_use]
pub fn serialize(set: &TreeChangeSet) -> PersistedChangeSet {
    let tree = set.tree();
    let mut persisted = PersistedTree::default();
    for node in tree.root_children(RootNamespace::Stores) {
        persisted
            .stores
            .insert(node.key().to_string(), persist_node(tree, node.path()));
    }
    for node in tree.root_children(RootNamespace::Brands) {
        persisted
            .brands
            .insert(node.key().to_string(), persist_node(tree, node.path()));
    }

    PersistedChangeSet {
        tree: persisted,
        images: set.images().clone(),
        last_modified: set.last_modified(),
        version: set.version(),
    }
}

fn persist_node(tree: &ChangeTree, path: &str) -> PersistedNode {
    // Nodes along a reachable path always resolve; a miss would mean the
    // index diverged from the tree, so fall back to an empty leaf rather
    // than panic inside persistence.
    let Some(node) = tree.get(path) else {
        return PersistedNode {
            key: path.rsplit('/').next().unwrap_or_default().to_string(),
            change: None,
            children: IndexMap::new(),
        };
    };

    let mut children = IndexMap::new();
    for segment in node.child_segments() {
        let child_path = format!("{path}/{segment}");
        children.insert(segment.to_string(), persist_node(tree, &child_path));
    }

    PersistedNode {
        key: node.key().to_string(),
        change: node.change().cloned(),
        children,
    }
}

/// Restore a change set from its persisted form, rebuilding the index
///
/// Only change-bearing paths are materialized; structural nodes are
/// recreated (or pruned) as a side effect, so a blob that violated the
/// pruning invariant loads into a consistent tree anyway.
///
/// # Errors
/// Returns [`SerialError::UnsupportedVersion`] for any version other than
/// [`CHANGE_SET_VERSION`].
pub fn deserialize(persisted: PersistedChangeSet) -> Result<TreeChangeSet, SerialError> {
    if persisted.version != CHANGE_SET_VERSION {
        return Err(SerialError::UnsupportedVersion {
            found: persisted.version,
        });
    }

    let mut tree = ChangeTree::new();
    for (segment, node) in &persisted.tree.stores {
        restore_node(&mut tree, format!("stores/{segment}"), node);
    }
    for (segment, node) in &persisted.tree.brands {
        restore_node(&mut tree, format!("brands/{segment}"), node);
    }

    Ok(TreeChangeSet::from_parts(
        tree,
        persisted.images,
        persisted.last_modified,
        persisted.version,
    ))
}

fn restore_node(tree: &mut ChangeTree, path: String, node: &PersistedNode) {
    if let Some(change) = &node.change {
        // Position in the restored tree is authoritative for the change's
        // identity; a change persisted at a namespace container (which has
        // no addressable path) is dropped as corrupt.
        if let Ok(entity_path) = path.parse::<EntityPath>() {
            let mut change = change.clone();
            change.relocate(&entity_path);
            tree.restore_node(&entity_path, Some(change));
        }
    }
    for (segment, child) in &node.children {
        restore_node(tree, format!("{path}/{segment}"), child);
    }
}

/// Render a change set to its persisted JSON document
///
/// # Errors
/// Returns [`SerialError::Json`] if encoding fails.
pub fn to_json(set: &TreeChangeSet) -> Result<String, SerialError> {
    serde_json::to_string(&serialize(set)).map_err(SerialError::Json)
}

/// Parse a persisted JSON document into a change set
///
/// # Errors
/// Returns [`SerialError::Json`] for malformed JSON and
/// [`SerialError::UnsupportedVersion`] for unknown versions. Never panics;
/// callers fall back to an empty change set on error.
pub fn from_json(json: &str) -> Result<TreeChangeSet, SerialError> {
    let persisted: PersistedChangeSet = serde_json::from_str(json).map_err(SerialError::Json)?;
    deserialize(persisted)
}

/// Serialization failures
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    /// Malformed JSON document
    #[error("malformed change set document: {0}")]
    Json(#[source] serde_json::Error),

    /// Version tag this engine does not understand
    #[error("unsupported change set version: {found}")]
    UnsupportedVersion { found: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::ImageReference;
    use ofd_catalog::{EntityKind, EntitySnapshot};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_set() -> TreeChangeSet {
        let mut set = TreeChangeSet::new();

        let brand = EntityPath::brand("b");
        let snapshot =
            EntitySnapshot::from_value(EntityKind::Brand, json!({"id": "b", "name": "B"}))
                .unwrap();
        set.set_change(&brand, Change::create(&brand, snapshot, "add brand"));

        let variant = EntityPath::variant("b", "PLA", "f", "red");
        set.set_change(&variant, Change::delete(&variant, "drop variant"));

        let store = EntityPath::store("acme");
        set.set_change(&store, Change::delete(&store, "drop store"));

        set.add_image(ImageReference::for_upload(
            brand,
            "logo",
            "logo.png",
            "image/png",
            b"logo bytes",
        ));
        set
    }

    #[test]
    fn round_trip_preserves_data_images_and_paths() {
        let set = sample_set();

        let restored = deserialize(serialize(&set)).unwrap();

        let mut original_paths = set.tree().reachable_paths();
        let mut restored_paths = restored.tree().reachable_paths();
        original_paths.sort();
        restored_paths.sort();
        assert_eq!(restored_paths, original_paths);

        assert_eq!(restored.all_changes(), set.all_changes());
        assert_eq!(restored.images(), set.images());
        assert_eq!(restored.last_modified(), set.last_modified());
        assert!(restored.tree().index_matches_tree());
    }

    #[test]
    fn json_round_trip() {
        let set = sample_set();
        let json = to_json(&set).unwrap();
        let restored = from_json(&json).unwrap();
        assert_eq!(restored.all_changes(), set.all_changes());
    }

    #[test]
    fn persisted_form_excludes_index_and_paths() {
        let set = sample_set();
        let json = to_json(&set).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value.get("index").is_none());
        let brand_node = &value["tree"]["brands"]["b"];
        assert!(brand_node.get("path").is_none());
        assert_eq!(brand_node["key"], "b");
    }

    #[test]
    fn from_json_rejects_malformed_documents() {
        assert!(matches!(from_json("not json"), Err(SerialError::Json(_))));
        assert!(matches!(from_json("{}"), Err(SerialError::Json(_))));
    }

    #[test]
    fn deserialize_rejects_unknown_version() {
        let mut persisted = serialize(&sample_set());
        persisted.version = 1;
        assert!(matches!(
            deserialize(persisted),
            Err(SerialError::UnsupportedVersion { found: 1 })
        ));
    }

    #[test]
    fn load_prunes_structure_that_bears_no_changes() {
        let mut persisted = serialize(&sample_set());
        // Inject a change-free subtree, as a hand-edited blob might.
        persisted.tree.brands.insert(
            "ghost".to_string(),
            PersistedNode {
                key: "ghost".to_string(),
                change: None,
                children: IndexMap::new(),
            },
        );

        let restored = deserialize(persisted).unwrap();

        assert!(restored.get_change("brands/ghost").is_none());
        assert!(restored.tree().get("brands/ghost").is_none());
        assert!(restored.tree().index_matches_tree());
    }
}
