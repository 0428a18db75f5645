//! OFD Durable Storage & Session
//!
//! Persists the pending change set and image bytes through a narrow
//! key/value abstraction, and exposes the [`EditorSession`] facade a host
//! UI drives.
//!
//! # Core Concepts
//!
//! - [`DurableStore`]: string key/value storage ([`MemoryStore`],
//!   [`FileStore`])
//! - [`EditorSession`]: tracking entry points implementing the per-path
//!   create/update/delete collapse rules, persisting after each mutation
//! - [`ExportBundle`]: everything pending, shaped for submission

#![warn(unreachable_pub)]

mod export;
mod kv;
mod session;

pub use export::{ExportBundle, ExportImage, ExportMetadata};
pub use kv::{DurableStore, FileStore, MemoryStore, StoreError};
pub use session::{EditorSession, CHANGE_SET_KEY, REDIRECTS_KEY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
