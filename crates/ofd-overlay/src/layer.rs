//! Collection (array) layering
//!
//! Applies the direct pending child changes under one parent scope to a
//! base array fetched for that scope. Only the direct-children query feeds
//! this, so cost is bounded by the branching factor at the scope, never by
//! the total number of pending changes.
//!
//! The output contract is set membership and per-key payload; ordering is
//! the caller's responsibility.

use indexmap::IndexMap;
use ofd_catalog::{EntitySnapshot, Slug};
use ofd_changes::{Change, ChangeOperation, ChangeTreeNode, EntityPath, RootNamespace, TreeChangeSet};

/// Layer the direct child changes of `parent` over a fetched base array
///
/// Keys are normalized once ([`Slug`]), so identifier matching (including
/// delete-by-key) is case-insensitive without re-lowercasing at each
/// comparison site.
#[must_use]
pub fn layer_children(
    set: &TreeChangeSet,
    parent: &EntityPath,
    base: Vec<EntitySnapshot>,
) -> Vec<EntitySnapshot> {
    apply_children(base, &set.direct_children(parent))
}

/// Layer the top-level changes of a root namespace over a fetched base
/// array (all brands, or all stores)
#[must_use]
pub fn layer_roots(
    set: &TreeChangeSet,
    namespace: RootNamespace,
    base: Vec<EntitySnapshot>,
) -> Vec<EntitySnapshot> {
    apply_children(base, &set.tree().root_children(namespace))
}

fn apply_children(
    base: Vec<EntitySnapshot>,
    children: &[&ChangeTreeNode],
) -> Vec<EntitySnapshot> {
    // Nothing pending under this scope: the common case.
    if children.iter().all(|node| node.change().is_none()) {
        return base;
    }

    let mut entities: IndexMap<Slug, EntitySnapshot> = base
        .into_iter()
        .map(|entity| (entity.public_id().clone(), entity))
        .collect();

    for node in children {
        let Some(change) = node.change() else {
            // Structural child: changes live deeper, nothing to apply here.
            continue;
        };
        let node_key = Slug::new(node.key());

        match change.operation {
            ChangeOperation::Create => {
                if let Some(data) = &change.data {
                    entities.insert(data.public_id().clone(), data.clone());
                }
            }
            ChangeOperation::Update => {
                if let Some(data) = &change.data {
                    // The structural key matches unless a rename relocated
                    // this node; then the first-edit snapshot still carries
                    // the identifier the base array knows.
                    if entities.shift_remove(&node_key).is_none() {
                        if let Some(original) = &change.original_data {
                            entities.shift_remove(original.public_id());
                        }
                    }
                    entities.insert(data.public_id().clone(), data.clone());
                }
            }
            ChangeOperation::Delete => {
                entities.shift_remove(&node_key);
            }
        }
    }

    entities.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofd_catalog::EntityKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn brand(id: &str) -> EntitySnapshot {
        EntitySnapshot::from_value(EntityKind::Brand, json!({"id": id})).unwrap()
    }

    fn material(id: &str) -> EntitySnapshot {
        EntitySnapshot::from_value(
            EntityKind::Material,
            json!({"id": id, "brand_id": "b", "material": id}),
        )
        .unwrap()
    }

    fn ids(entities: &[EntitySnapshot]) -> Vec<&str> {
        entities.iter().map(|e| e.public_id().as_str()).collect()
    }

    #[test]
    fn empty_change_set_returns_base_unchanged() {
        let set = TreeChangeSet::new();
        let base = vec![brand("acme"), brand("other")];

        let layered = layer_roots(&set, RootNamespace::Brands, base.clone());

        assert_eq!(layered, base);
    }

    #[test]
    fn structural_children_leave_base_unchanged() {
        let mut set = TreeChangeSet::new();
        // A deep change makes brands/b structural at the root level.
        let variant = EntityPath::variant("b", "PLA", "f", "red");
        set.set_change(&variant, Change::delete(&variant, "drop"));

        let base = vec![brand("b")];
        let layered = layer_roots(&set, RootNamespace::Brands, base.clone());

        assert_eq!(layered, base);
    }

    #[test]
    fn create_inserts_new_entity() {
        let mut set = TreeChangeSet::new();
        let path = EntityPath::material("b", "PETG");
        set.set_change(&path, Change::create(&path, material("PETG"), "add"));

        let layered = layer_children(&set, &EntityPath::brand("b"), vec![material("pla")]);

        assert_eq!(ids(&layered), vec!["pla", "petg"]);
    }

    #[test]
    fn update_replaces_payload_under_same_key() {
        let mut set = TreeChangeSet::new();
        let path = EntityPath::brand("acme");
        let original = brand("acme");
        let edited = EntitySnapshot::from_value(
            EntityKind::Brand,
            json!({"id": "acme", "name": "Acme Filaments"}),
        )
        .unwrap();
        set.set_change(
            &path,
            Change::update(&path, original.clone(), edited.clone(), "edit"),
        );

        let layered = layer_roots(&set, RootNamespace::Brands, vec![original, brand("other")]);

        assert_eq!(layered.len(), 2);
        assert!(layered.contains(&edited));
    }

    #[test]
    fn renamed_update_matches_base_by_original_identifier() {
        let mut set = TreeChangeSet::new();
        let old_path = EntityPath::material("b", "PLA");
        let new_path = EntityPath::material("b", "PETG");
        let update = Change::update(&old_path, material("PLA"), material("PETG"), "rename");
        set.set_change(&old_path, update);
        set.move_subtree(&old_path, &new_path);

        // Base still serves the old name; no duplicate may appear.
        let layered = layer_children(
            &set,
            &EntityPath::brand("b"),
            vec![material("PLA"), material("ABS")],
        );

        assert_eq!(ids(&layered), vec!["abs", "petg"]);
    }

    #[test]
    fn delete_matches_key_case_insensitively() {
        let mut set = TreeChangeSet::new();
        let path = EntityPath::brand("acme");
        set.set_change(&path, Change::delete(&path, "remove"));

        let base = vec![brand("Acme"), brand("other")];
        let layered = layer_roots(&set, RootNamespace::Brands, base);

        assert_eq!(ids(&layered), vec!["other"]);
    }

    #[test]
    fn delete_for_brand_acme_leaves_only_other() {
        let mut set = TreeChangeSet::new();
        let path = EntityPath::brand("acme");
        set.set_change(&path, Change::delete(&path, "remove"));

        let layered = layer_roots(
            &set,
            RootNamespace::Brands,
            vec![brand("acme"), brand("other")],
        );

        assert_eq!(ids(&layered), vec!["other"]);
    }
}
