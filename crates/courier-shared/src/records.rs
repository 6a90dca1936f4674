//! Validated value objects for files, mailbox messages, and the
//! stored-file manifest.
//!
//! Constructors return either a fully valid record or a typed
//! [`ValidationError`]; a half-valid entity cannot be observed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::types::{Subdomain, SwarmReference};

/// An immutable description of a stored blob. Created only after a
/// successful content-store put.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub reference: SwarmReference,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl FileRecord {
    pub fn new(
        reference: SwarmReference,
        filename: &str,
        mime_type: &str,
        size_bytes: u64,
    ) -> Result<Self, ValidationError> {
        if filename.is_empty() {
            return Err(ValidationError::MissingField("filename"));
        }
        if mime_type.is_empty() {
            return Err(ValidationError::MissingField("mime_type"));
        }
        Ok(Self {
            reference,
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
        })
    }
}

/// A delivery record appended to a recipient's mailbox. Never mutated
/// or deleted once created; `sequence` is assigned by the mailbox
/// service at append time and is strictly increasing per mailbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: Uuid,
    pub to: Subdomain,
    pub from: Subdomain,
    pub file: FileRecord,
    pub sequence: u64,
    /// Reference of the persisted six-field payload in the content store.
    pub payload_ref: SwarmReference,
    pub sent_at: DateTime<Utc>,
}

/// The six-field payload persisted for every delivery. All fields are
/// required; absence is a construction-time failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePayload {
    pub to: String,
    pub from: String,
    pub swarmhash: String,
    pub filename: String,
    pub mime: String,
    pub size: u64,
}

impl MessagePayload {
    pub fn new(to: &Subdomain, from: &Subdomain, file: &FileRecord) -> Self {
        Self {
            to: to.to_string(),
            from: from.to_string(),
            swarmhash: file.reference.to_hex(),
            filename: file.filename.clone(),
            mime: file.mime_type.clone(),
            size: file.size_bytes,
        }
    }
}

/// A self-stored file registered in the owner's manifest. The `pinned`
/// flag is legacy-informational only; persistence is governed by stamp
/// capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredFileEntry {
    pub file: FileRecord,
    pub pinned: bool,
    pub owner: Subdomain,
    pub stored_at: DateTime<Utc>,
}

/// Wire shape of one stored-file manifest entry:
/// `{ file: {name, size}, meta: {pinned}, hash }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub file: ManifestFileInfo,
    pub meta: ManifestMeta,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestFileInfo {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestMeta {
    pub pinned: bool,
}

impl From<&StoredFileEntry> for ManifestEntry {
    fn from(entry: &StoredFileEntry) -> Self {
        Self {
            file: ManifestFileInfo {
                name: entry.file.filename.clone(),
                size: entry.file.size_bytes,
            },
            meta: ManifestMeta {
                pinned: entry.pinned,
            },
            hash: entry.file.reference.to_hex(),
        }
    }
}
