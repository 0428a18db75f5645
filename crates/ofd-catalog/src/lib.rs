//! OFD Catalog Entity Model
//!
//! Typed snapshots of the five catalog entity kinds edited by the admin
//! tool: stores, brands, materials, filaments and color variants.
//!
//! # Core Concepts
//!
//! - [`EntityKind`]: the five-kind hierarchy tag
//! - [`Slug`]: identifier normalized once at the boundary
//! - [`EntitySnapshot`]: closed, per-kind tagged snapshot of one entity
//!
//! Payloads enter the system as loose JSON fetched over HTTP and are
//! validated into a snapshot exactly once, at the boundary; the change
//! tree only ever stores already-validated snapshots.

#![warn(unreachable_pub)]

mod kind;
mod slug;
mod snapshot;

pub use kind::{EntityKind, UnknownKind};
pub use slug::Slug;
pub use snapshot::{
    Brand, CatalogError, EntitySnapshot, Filament, Material, Store, Variant,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
