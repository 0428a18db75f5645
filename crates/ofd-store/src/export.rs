//! Submission bundle
//!
//! Snapshot of everything pending, shaped for the downstream pull-request
//! pipeline: flat change list plus inlined base64 image payloads.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use ofd_changes::Change;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything pending, ready to hand off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub metadata: ExportMetadata,
    pub changes: Vec<Change>,
    pub images: IndexMap<Uuid, ExportImage>,
}

/// Bundle provenance block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub generated_at: DateTime<Utc>,
    pub change_count: usize,
    pub version: u32,
}

/// One image payload, inlined for transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportImage {
    pub filename: String,
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}
