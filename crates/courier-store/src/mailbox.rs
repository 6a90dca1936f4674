//! Per-identity append-only mailboxes.
//!
//! The service is the single point of truth for delivery ordering:
//! sequence numbers are assigned at append time under a per-mailbox
//! mutex, so concurrent sends to one recipient serialize while
//! different mailboxes append independently. Records are appended,
//! never mutated or deleted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;
use x25519_dalek::PublicKey;

use courier_shared::error::{MailboxError, NetworkError};
use courier_shared::records::{
    FileRecord, ManifestEntry, MessagePayload, MessageRecord, StoredFileEntry,
};
use courier_shared::types::Subdomain;

use crate::content::ContentStore;

/// A resolved recipient: the mailbox address plus the public key used
/// to encrypt for them.
#[derive(Debug, Clone)]
pub struct RecipientInfo {
    pub subdomain: Subdomain,
    pub public_key: PublicKey,
}

/// Subdomain lookup. Resolution failure means the recipient does not
/// exist as far as the caller is concerned.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, subdomain: &Subdomain) -> Result<RecipientInfo, MailboxError>;
}

/// In-process resolver backed by a registration table.
#[derive(Clone, Default)]
pub struct StaticResolver {
    entries: Arc<RwLock<HashMap<Subdomain, PublicKey>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, subdomain: Subdomain, public_key: PublicKey) {
        let mut entries = self.entries.write().await;
        entries.insert(subdomain, public_key);
    }
}

#[async_trait]
impl NameResolver for StaticResolver {
    async fn resolve(&self, subdomain: &Subdomain) -> Result<RecipientInfo, MailboxError> {
        let entries = self.entries.read().await;
        entries
            .get(subdomain)
            .map(|public_key| RecipientInfo {
                subdomain: subdomain.clone(),
                public_key: *public_key,
            })
            .ok_or_else(|| MailboxError::RecipientUnresolved(subdomain.to_string()))
    }
}

struct Mailbox {
    next_sequence: u64,
    records: Vec<MessageRecord>,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            next_sequence: 1,
            records: Vec::new(),
        }
    }
}

/// Append-only delivery records plus the self-stored file manifest.
#[derive(Clone)]
pub struct MailboxService {
    store: Arc<dyn ContentStore>,
    resolver: Arc<dyn NameResolver>,
    mailboxes: Arc<RwLock<HashMap<Subdomain, Arc<Mutex<Mailbox>>>>>,
    stored: Arc<RwLock<HashMap<Subdomain, Vec<StoredFileEntry>>>>,
}

impl MailboxService {
    pub fn new(store: Arc<dyn ContentStore>, resolver: Arc<dyn NameResolver>) -> Self {
        Self {
            store,
            resolver,
            mailboxes: Arc::new(RwLock::new(HashMap::new())),
            stored: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn resolver(&self) -> Arc<dyn NameResolver> {
        Arc::clone(&self.resolver)
    }

    async fn mailbox_handle(&self, subdomain: &Subdomain) -> Arc<Mutex<Mailbox>> {
        let mut mailboxes = self.mailboxes.write().await;
        Arc::clone(
            mailboxes
                .entry(subdomain.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Mailbox::new()))),
        )
    }

    /// Deliver a file record to `to`'s mailbox. Resolves the recipient,
    /// persists the six-field payload through the content store, then
    /// appends with the next sequence number for that mailbox.
    pub async fn send(
        &self,
        from: &Subdomain,
        to: &Subdomain,
        file: FileRecord,
    ) -> Result<MessageRecord, MailboxError> {
        let recipient = self.resolver.resolve(to).await?;

        let payload = MessagePayload::new(&recipient.subdomain, from, &file);
        let payload_bytes = serde_json::to_vec(&payload)
            .map_err(|e| NetworkError::Backend(format!("payload encoding failed: {e}")))
            .map_err(MailboxError::Network)?;

        let handle = self.mailbox_handle(&recipient.subdomain).await;
        let mut mailbox = handle.lock().await;

        // Persist before assigning the sequence so a failed put leaves
        // no gap in the mailbox.
        let payload_ref = self
            .store
            .put(&payload_bytes)
            .await
            .map_err(MailboxError::Network)?;

        let sequence = mailbox.next_sequence;
        mailbox.next_sequence += 1;

        let record = MessageRecord {
            id: Uuid::new_v4(),
            to: recipient.subdomain.clone(),
            from: from.clone(),
            file,
            sequence,
            payload_ref,
            sent_at: Utc::now(),
        };
        mailbox.records.push(record.clone());

        info!(
            to = %record.to,
            from = %record.from,
            sequence,
            reference = %record.file.reference.short(),
            "Message delivered"
        );
        Ok(record)
    }

    /// An identity's own mailbox, ascending sequence order. Empty when
    /// nothing has been delivered; never an error.
    pub async fn list_messages(&self, subdomain: &Subdomain) -> Vec<MessageRecord> {
        let mailboxes = self.mailboxes.read().await;
        match mailboxes.get(subdomain) {
            Some(handle) => handle.lock().await.records.clone(),
            None => Vec::new(),
        }
    }

    /// Read a record's persisted payload back from the content store.
    pub async fn fetch_payload(
        &self,
        record: &MessageRecord,
    ) -> Result<MessagePayload, NetworkError> {
        let bytes = self.store.get(&record.payload_ref).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| NetworkError::Backend(format!("payload decoding failed: {e}")))
    }

    /// Register a self-stored file without recipient resolution. The
    /// `pinned` flag is legacy-informational and has no effect on
    /// persistence.
    pub async fn store_self(&self, owner: &Subdomain, file: FileRecord) -> StoredFileEntry {
        let entry = StoredFileEntry {
            file,
            pinned: false,
            owner: owner.clone(),
            stored_at: Utc::now(),
        };

        let mut stored = self.stored.write().await;
        stored.entry(owner.clone()).or_default().push(entry.clone());

        debug!(
            owner = %owner,
            reference = %entry.file.reference.short(),
            "Self-store registered"
        );
        entry
    }

    pub async fn list_stored(&self, owner: &Subdomain) -> Vec<StoredFileEntry> {
        let stored = self.stored.read().await;
        stored.get(owner).cloned().unwrap_or_default()
    }

    /// The owner's stored-file manifest in its wire shape.
    pub async fn manifest(&self, owner: &Subdomain) -> Vec<ManifestEntry> {
        self.list_stored(owner)
            .await
            .iter()
            .map(ManifestEntry::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_shared::keys::KeyManager;
    use courier_shared::types::SwarmReference;
    use futures::future::join_all;

    use crate::content::MemoryStore;

    fn name(s: &str) -> Subdomain {
        Subdomain::new(s).unwrap()
    }

    fn file(label: &[u8]) -> FileRecord {
        FileRecord::new(SwarmReference::for_content(label), "a.txt", "text/plain", 10).unwrap()
    }

    async fn service_with(recipients: &[&str]) -> MailboxService {
        let resolver = StaticResolver::new();
        for recipient in recipients {
            let keys = KeyManager::from_wallet_secret(recipient.as_bytes());
            resolver.register(name(recipient), keys.public_key()).await;
        }
        MailboxService::new(Arc::new(MemoryStore::new()), Arc::new(resolver))
    }

    #[tokio::test]
    async fn test_sequences_strictly_increase() {
        let service = service_with(&["bob"]).await;
        let alice = name("alice");
        let bob = name("bob");

        for expected in 1..=5u64 {
            let record = service.send(&alice, &bob, file(b"x")).await.unwrap();
            assert_eq!(record.sequence, expected);
        }
    }

    #[tokio::test]
    async fn test_concurrent_sends_no_duplicates_or_gaps() {
        let service = service_with(&["bob"]).await;
        let bob = name("bob");

        let sends = (0..16).map(|i| {
            let service = service.clone();
            let bob = bob.clone();
            async move {
                service
                    .send(&name("alice"), &bob, file(format!("file-{i}").as_bytes()))
                    .await
                    .unwrap()
                    .sequence
            }
        });

        let mut sequences: Vec<u64> = join_all(sends).await;
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=16).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_mailboxes_are_independent() {
        let service = service_with(&["bob", "carol"]).await;
        let alice = name("alice");

        let to_bob = service.send(&alice, &name("bob"), file(b"x")).await.unwrap();
        let to_carol = service
            .send(&alice, &name("carol"), file(b"y"))
            .await
            .unwrap();

        assert_eq!(to_bob.sequence, 1);
        assert_eq!(to_carol.sequence, 1);
    }

    #[tokio::test]
    async fn test_unresolved_recipient_fails() {
        let service = service_with(&[]).await;
        let result = service.send(&name("alice"), &name("ghost"), file(b"x")).await;
        assert!(matches!(result, Err(MailboxError::RecipientUnresolved(_))));
    }

    #[tokio::test]
    async fn test_empty_mailbox_is_empty_not_error() {
        let service = service_with(&[]).await;
        assert!(service.list_messages(&name("nobody")).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_ascending_order() {
        let service = service_with(&["bob"]).await;
        let bob = name("bob");

        for i in 0..4 {
            service
                .send(&name("alice"), &bob, file(format!("f{i}").as_bytes()))
                .await
                .unwrap();
        }

        let listed = service.list_messages(&bob).await;
        let sequences: Vec<u64> = listed.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_payload_roundtrip() {
        let service = service_with(&["bob"]).await;
        let record = service
            .send(&name("alice"), &name("bob"), file(b"x"))
            .await
            .unwrap();

        let payload = service.fetch_payload(&record).await.unwrap();
        assert_eq!(payload.to, "bob");
        assert_eq!(payload.from, "alice");
        assert_eq!(payload.swarmhash, record.file.reference.to_hex());
        assert_eq!(payload.size, 10);
    }

    #[tokio::test]
    async fn test_store_self_and_manifest() {
        let service = service_with(&[]).await;
        let alice = name("alice");

        let entry = service.store_self(&alice, file(b"mine")).await;
        assert!(!entry.pinned);

        let manifest = service.manifest(&alice).await;
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].file.name, "a.txt");
        assert_eq!(manifest[0].hash, entry.file.reference.to_hex());
    }
}
