//! Single-entity overlay
//!
//! Merges one base entity with at most one pending change for its
//! canonical path. Create and update substitute the full pending snapshot,
//! never a field-level merge, and delete suppresses the entity.

use ofd_catalog::EntitySnapshot;
use ofd_changes::{Change, ChangeOperation};

/// Result of overlaying one base entity with its pending change
#[derive(Debug, Clone, PartialEq)]
pub enum Overlaid {
    /// No pending change; the base entity passes through untouched
    Unchanged(EntitySnapshot),

    /// A pending create/update snapshot replaces the base wholesale
    Local(EntitySnapshot),

    /// A pending delete hides the entity (treated as not found)
    Suppressed,

    /// Neither the server nor the change set knows this entity
    Absent,
}

impl Overlaid {
    /// The effective entity, if one is visible
    #[inline]
    #[must_use]
    pub fn entity(&self) -> Option<&EntitySnapshot> {
        match self {
            Self::Unchanged(entity) | Self::Local(entity) => Some(entity),
            Self::Suppressed | Self::Absent => None,
        }
    }

    /// Whether a pending local edit produced this result
    #[inline]
    #[must_use]
    pub fn has_local_changes(&self) -> bool {
        matches!(self, Self::Local(_) | Self::Suppressed)
    }
}

/// Overlay one base entity with its (at most one) pending change
///
/// `base` is `None` when the server has no record (a pending create is
/// then the only way the entity becomes visible).
#[must_use]
pub fn overlay_entity(base: Option<EntitySnapshot>, change: Option<&Change>) -> Overlaid {
    let Some(change) = change else {
        return match base {
            Some(entity) => Overlaid::Unchanged(entity),
            None => Overlaid::Absent,
        };
    };

    match change.operation {
        ChangeOperation::Delete => Overlaid::Suppressed,
        ChangeOperation::Create | ChangeOperation::Update => match &change.data {
            Some(snapshot) => Overlaid::Local(snapshot.clone()),
            // A create/update without a snapshot carries nothing to show;
            // fall back to the base rather than fabricate an entity.
            None => match base {
                Some(entity) => Overlaid::Unchanged(entity),
                None => Overlaid::Absent,
            },
        },
    }
}
