//! Per-login session context.
//!
//! A [`Session`] carries the unlocked identity together with the
//! service handles every call needs. It is passed explicitly; there is
//! no process-wide "current account" state.

use std::sync::Arc;
use std::time::Duration;

use courier_shared::constants::DEFAULT_SPONSOR_TIMEOUT_SECS;
use courier_shared::identity::Identity;
use courier_store::{ContentStore, MailboxService, StampLedger};

/// Everything an upload action needs: who is acting, where bytes go,
/// how capacity is accounted, and where deliveries land.
#[derive(Clone)]
pub struct Session {
    identity: Identity,
    store: Arc<dyn ContentStore>,
    ledger: StampLedger,
    mailbox: MailboxService,
    sponsor_timeout: Duration,
}

impl Session {
    pub fn new(
        identity: Identity,
        store: Arc<dyn ContentStore>,
        ledger: StampLedger,
        mailbox: MailboxService,
    ) -> Self {
        Self {
            identity,
            store,
            ledger,
            mailbox,
            sponsor_timeout: Duration::from_secs(DEFAULT_SPONSOR_TIMEOUT_SECS),
        }
    }

    /// Override the sponsored-stamp request timeout.
    pub fn with_sponsor_timeout(mut self, timeout: Duration) -> Self {
        self.sponsor_timeout = timeout;
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn store(&self) -> Arc<dyn ContentStore> {
        Arc::clone(&self.store)
    }

    pub fn ledger(&self) -> &StampLedger {
        &self.ledger
    }

    pub fn mailbox(&self) -> &MailboxService {
        &self.mailbox
    }

    pub fn sponsor_timeout(&self) -> Duration {
        self.sponsor_timeout
    }
}
