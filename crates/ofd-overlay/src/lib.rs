//! OFD Overlay Engine
//!
//! Reconciles pending local edits with freshly-fetched authoritative data
//! for display and routing.
//!
//! # Core Concepts
//!
//! - [`overlay_entity`]: substitute or suppress one base entity with its
//!   (at most one) pending change
//! - [`layer_children`] / [`layer_roots`]: the same reconciliation applied
//!   across a whole fetched collection at once
//! - [`RenameLedger`]: old↔new path bookkeeping so bookmarked URLs survive
//!   an in-flight rename
//!
//! All operations here are pure reads: they accept already-resolved data
//! and never mutate the change set.

#![warn(unreachable_pub)]

mod layer;
mod overlay;
mod redirect;

pub use layer::{layer_children, layer_roots};
pub use overlay::{overlay_entity, Overlaid};
pub use redirect::RenameLedger;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
