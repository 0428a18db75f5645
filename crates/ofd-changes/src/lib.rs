//! OFD Change Tree
//!
//! Client-resident record of pending creates, updates, deletes and renames
//! against the five-level catalog hierarchy.
//!
//! # Core Concepts
//!
//! - [`EntityPath`]: typed, tagged address of a hierarchy node with a
//!   canonical slash-delimited string form
//! - [`Change`]: one pending edit (full-snapshot semantics, never a
//!   field-level merge)
//! - [`ChangeTree`]: the tree of pending changes with its derived
//!   path-string index
//! - [`TreeChangeSet`]: tree + image registry + persistence metadata
//! - [`ImageReference`]: metadata-only pointer to image bytes stored under
//!   a content-addressed key
//!
//! The engine is synchronous and single-threaded: every mutation completes
//! within one call, reads are pure, and callers in a multi-threaded host
//! must serialize access externally.

#![warn(unreachable_pub)]

mod change;
mod hash;
mod images;
mod moving;
mod path;
mod serial;
mod set;
mod tree;

pub use change::{diff_properties, Change, ChangeOperation, EntityIdent, PropertyChange};
pub use hash::ContentHash;
pub use images::{ImageReference, ImageRegistry};
pub use path::{EntityPath, PathError, RootNamespace};
pub use serial::{
    deserialize, from_json, serialize, to_json, PersistedChangeSet, PersistedNode, PersistedTree,
    SerialError, CHANGE_SET_VERSION,
};
pub use set::{RemovedSubtree, TreeChangeSet};
pub use tree::{ChangeTree, ChangeTreeNode};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
