//! Postage stamp ledger: finite storage-capacity accounting.
//!
//! Stamps are a scarce, shared, external resource. The ledger never
//! blocks an upload indefinitely on sponsorship; when no usable stamp
//! can be obtained it degrades to the zero-filled placeholder so the
//! upload proceeds against best-effort local capacity.
//!
//! Capacity accounting is eventually reconciled by the network, not
//! locally. Selection is therefore optimistic: concurrent pipelines may
//! race for the same stamp, but usability is re-validated at the moment
//! of use rather than trusted from a stale snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use courier_shared::error::{CapacityError, NetworkError};
use courier_shared::types::BatchId;

/// One capacity allowance. Never explicitly deleted; records age out
/// when exhausted or expired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StampRecord {
    pub batch_id: BatchId,
    pub total_capacity: u64,
    pub used_capacity: u64,
    /// As reported by the network. Re-checked locally by
    /// [`StampRecord::is_usable`] before any use.
    pub usable: bool,
    pub expires_at: DateTime<Utc>,
}

impl StampRecord {
    pub fn remaining(&self) -> u64 {
        self.total_capacity.saturating_sub(self.used_capacity)
    }

    /// usable flag AND capacity left AND not expired, evaluated now.
    pub fn is_usable(&self) -> bool {
        self.usable && self.used_capacity < self.total_capacity && Utc::now() < self.expires_at
    }

    /// The local placeholder stamp: zero-filled batch id, no tracked
    /// allowance. Substituted when sponsorship fails so an upload can
    /// still proceed.
    pub fn placeholder() -> Self {
        Self {
            batch_id: BatchId::placeholder(),
            total_capacity: 0,
            used_capacity: 0,
            usable: false,
            expires_at: DateTime::<Utc>::MAX_UTC,
        }
    }
}

/// Network collaborator the ledger queries for stamps. `list_stamps`
/// reflects the allowance pool; `request_stamp` asks an external
/// sponsor for fresh capacity.
#[async_trait]
pub trait StampProvider: Send + Sync {
    async fn list_stamps(&self) -> Result<Vec<StampRecord>, NetworkError>;
    async fn request_stamp(&self) -> Result<StampRecord, CapacityError>;
}

/// Tracks stamp allowances and selects capacity for uploads.
///
/// Holds a local optimistic usage overlay on top of the provider's
/// view: usage is recorded only after a successful store, so a failed
/// upload never "spends" capacity it did not use.
#[derive(Clone)]
pub struct StampLedger {
    provider: Arc<dyn StampProvider>,
    local_usage: Arc<RwLock<HashMap<BatchId, u64>>>,
}

impl StampLedger {
    pub fn new(provider: Arc<dyn StampProvider>) -> Self {
        Self {
            provider,
            local_usage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Current stamp list, re-fetched from the provider on every call
    /// (never cached) with the local usage overlay applied.
    pub async fn list_stamps(&self) -> Result<Vec<StampRecord>, NetworkError> {
        let mut stamps = self.provider.list_stamps().await?;
        let usage = self.local_usage.read().await;
        for stamp in &mut stamps {
            if let Some(extra) = usage.get(&stamp.batch_id) {
                stamp.used_capacity = stamp.used_capacity.saturating_add(*extra);
            }
        }
        Ok(stamps)
    }

    /// Pick a usable stamp, most remaining capacity first, to spread
    /// load and delay exhaustion. `None` when no stamp is usable or the
    /// provider cannot be reached (selection never blocks an upload).
    pub async fn select_usable_stamp(&self) -> Option<StampRecord> {
        let stamps = match self.list_stamps().await {
            Ok(stamps) => stamps,
            Err(e) => {
                warn!(error = %e, "Stamp listing failed during selection");
                return None;
            }
        };

        // First usable record wins a tie on remaining capacity
        let mut best: Option<StampRecord> = None;
        for stamp in stamps.into_iter().filter(StampRecord::is_usable) {
            match &best {
                Some(current) if stamp.remaining() <= current.remaining() => {}
                _ => best = Some(stamp),
            }
        }
        best
    }

    /// Ask the sponsor for fresh capacity, bounded by `timeout`.
    /// Failure is recoverable: callers fall back to
    /// [`StampRecord::placeholder`].
    pub async fn request_sponsored_stamp(
        &self,
        timeout: Duration,
    ) -> Result<StampRecord, CapacityError> {
        match tokio::time::timeout(timeout, self.provider.request_stamp()).await {
            Ok(Ok(stamp)) => {
                debug!(batch_id = %stamp.batch_id, "Sponsored stamp granted");
                Ok(stamp)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CapacityError::SponsorTimeout),
        }
    }

    /// Aggregate remaining capacity across usable stamps, in the
    /// network's capacity unit. 0 when none are usable or the provider
    /// fails; never errors.
    pub async fn report_balance(&self) -> u64 {
        match self.list_stamps().await {
            Ok(stamps) => stamps
                .iter()
                .filter(|s| s.is_usable())
                .map(StampRecord::remaining)
                .sum(),
            Err(e) => {
                warn!(error = %e, "Stamp listing failed; reporting zero balance");
                0
            }
        }
    }

    /// Record capacity actually consumed by a successful store. Must
    /// not be called for failed uploads.
    pub async fn record_usage(&self, batch_id: &BatchId, bytes: u64) {
        if batch_id.is_placeholder() {
            return;
        }
        let mut usage = self.local_usage.write().await;
        *usage.entry(batch_id.clone()).or_insert(0) += bytes;
        debug!(batch_id = %batch_id, bytes, "Recorded stamp usage");
    }
}

/// In-process allowance pool, used as the local development backend and
/// in tests. Sponsorship mints a fresh stamp into the pool.
pub struct PooledStampProvider {
    pool: Arc<RwLock<Vec<StampRecord>>>,
    sponsor_capacity: u64,
    sponsor_validity: chrono::Duration,
}

impl PooledStampProvider {
    pub fn new(initial: Vec<StampRecord>) -> Self {
        Self {
            pool: Arc::new(RwLock::new(initial)),
            sponsor_capacity: 1 << 20,
            sponsor_validity: chrono::Duration::days(30),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn mint_batch_id() -> BatchId {
        let hash = blake3::hash(uuid::Uuid::new_v4().as_bytes());
        BatchId::new(&format!("0x{}", hex::encode(hash.as_bytes())))
            .unwrap_or_else(|_| BatchId::placeholder())
    }
}

#[async_trait]
impl StampProvider for PooledStampProvider {
    async fn list_stamps(&self) -> Result<Vec<StampRecord>, NetworkError> {
        Ok(self.pool.read().await.clone())
    }

    async fn request_stamp(&self) -> Result<StampRecord, CapacityError> {
        let stamp = StampRecord {
            batch_id: Self::mint_batch_id(),
            total_capacity: self.sponsor_capacity,
            used_capacity: 0,
            usable: true,
            expires_at: Utc::now() + self.sponsor_validity,
        };
        let mut pool = self.pool.write().await;
        pool.push(stamp.clone());
        Ok(stamp)
    }
}
