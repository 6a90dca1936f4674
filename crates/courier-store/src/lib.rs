//! # courier-store
//!
//! Persistence-facing services: the content-addressed blob store seam,
//! the postage stamp ledger that accounts for finite storage capacity,
//! and the append-only mailbox service that orders deliveries.

pub mod content;
pub mod mailbox;
pub mod stamps;

pub use content::{ContentStore, FsStore, MemoryStore};
pub use mailbox::{MailboxService, NameResolver, RecipientInfo, StaticResolver};
pub use stamps::{PooledStampProvider, StampLedger, StampProvider, StampRecord};
