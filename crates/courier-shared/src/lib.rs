//! # courier-shared
//!
//! Value types, validated records, and key material shared by every
//! Courier crate: content references, mailbox records, the wallet-bound
//! identity, and the sealed-box encryption used for file delivery.

pub mod constants;
pub mod error;
pub mod identity;
pub mod keys;
pub mod records;
pub mod types;

pub use error::CourierError;
pub use identity::{Identity, SealedWallet};
pub use keys::KeyManager;
pub use records::{FileRecord, ManifestEntry, MessagePayload, MessageRecord, StoredFileEntry};
pub use types::{BatchId, Subdomain, SwarmReference, UploadMode};
