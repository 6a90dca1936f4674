//! Legacy pin/warrant/balance API, preserved call-for-call on top of
//! the stamp ledger.
//!
//! This shim is a deliberate compatibility fiction. Persistence is
//! governed entirely by stamp capacity now, so `pin`/`unpin` succeed
//! without doing anything, and nothing here ever propagates an error to
//! a legacy caller. Integrations that polled pin status should migrate
//! to polling [`StampLedger::report_balance`] and stamp expiry. The
//! no-op semantics stop at this layer; the ledger's own accounting is
//! untouched by it.

use std::time::Duration;

use tracing::warn;

use courier_shared::constants::{DEFAULT_SPONSOR_TIMEOUT_SECS, LEGACY_BALANCE_UNIT};
use courier_shared::types::BatchId;
use courier_store::StampLedger;

/// Status value the legacy pin API expects. Always `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinStatus {
    Ok,
}

impl PinStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

pub struct PinCompat {
    ledger: StampLedger,
    sponsor_timeout: Duration,
}

impl PinCompat {
    pub fn new(ledger: StampLedger) -> Self {
        Self {
            ledger,
            sponsor_timeout: Duration::from_secs(DEFAULT_SPONSOR_TIMEOUT_SECS),
        }
    }

    pub fn with_sponsor_timeout(mut self, timeout: Duration) -> Self {
        self.sponsor_timeout = timeout;
        self
    }

    /// Legacy `createWarrant(value)`: requests sponsored capacity and
    /// returns its batch id. The requested value is advisory only; the
    /// sponsor decides the granted capacity. Returns the zero-filled
    /// placeholder on any failure, never an error.
    pub async fn create_warrant(&self, _value: u64) -> BatchId {
        match self.ledger.request_sponsored_stamp(self.sponsor_timeout).await {
            Ok(stamp) => stamp.batch_id,
            Err(e) => {
                warn!(error = %e, "Warrant creation degraded to placeholder");
                BatchId::placeholder()
            }
        }
    }

    /// Legacy `getMyBalance()`: the ledger balance scaled by
    /// [`LEGACY_BALANCE_UNIT`]. 0 when no usable stamp exists or on any
    /// internal failure; never raises.
    pub async fn get_my_balance(&self) -> u64 {
        self.ledger
            .report_balance()
            .await
            .saturating_mul(LEGACY_BALANCE_UNIT)
    }

    /// Legacy `pin(hash)`: no-op, persistence is stamp-governed.
    pub fn pin(&self, _reference: &str) -> PinStatus {
        PinStatus::Ok
    }

    /// Legacy `unpin(hash)`: no-op, persistence is stamp-governed.
    pub fn unpin(&self, _reference: &str) -> PinStatus {
        PinStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};

    use courier_shared::error::{CapacityError, NetworkError};
    use courier_store::{PooledStampProvider, StampProvider, StampRecord};

    struct DeadSponsor;

    #[async_trait]
    impl StampProvider for DeadSponsor {
        async fn list_stamps(&self) -> Result<Vec<StampRecord>, NetworkError> {
            Err(NetworkError::Timeout)
        }

        async fn request_stamp(&self) -> Result<StampRecord, CapacityError> {
            Err(CapacityError::SponsorRejected("sponsor offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_balance_zero_without_stamps_never_raises() {
        let shim = PinCompat::new(StampLedger::new(Arc::new(PooledStampProvider::empty())));
        assert_eq!(shim.get_my_balance().await, 0);

        let shim = PinCompat::new(StampLedger::new(Arc::new(DeadSponsor)));
        assert_eq!(shim.get_my_balance().await, 0);
    }

    #[tokio::test]
    async fn test_balance_scaled_by_legacy_unit() {
        let stamp = StampRecord {
            batch_id: BatchId::new(&format!("0x{}", "cd".repeat(32))).unwrap(),
            total_capacity: 100,
            used_capacity: 25,
            usable: true,
            expires_at: Utc::now() + ChronoDuration::days(7),
        };
        let shim = PinCompat::new(StampLedger::new(Arc::new(PooledStampProvider::new(vec![
            stamp,
        ]))));
        assert_eq!(shim.get_my_balance().await, 75 * LEGACY_BALANCE_UNIT);
    }

    #[tokio::test]
    async fn test_create_warrant_returns_real_batch_id() {
        let shim = PinCompat::new(StampLedger::new(Arc::new(PooledStampProvider::empty())));
        let batch_id = shim.create_warrant(100).await;
        assert!(!batch_id.is_placeholder());
    }

    #[tokio::test]
    async fn test_create_warrant_falls_back_to_placeholder() {
        let shim = PinCompat::new(StampLedger::new(Arc::new(DeadSponsor)));
        let batch_id = shim.create_warrant(100).await;
        assert!(batch_id.is_placeholder());
    }

    #[tokio::test]
    async fn test_pin_unpin_are_successful_noops() {
        let ledger = StampLedger::new(Arc::new(PooledStampProvider::empty()));
        let shim = PinCompat::new(ledger.clone());

        assert!(shim.pin(&"a".repeat(64)).is_ok());
        assert!(shim.unpin(&"a".repeat(64)).is_ok());
        // The fiction does not leak into ledger accounting
        assert_eq!(ledger.report_balance().await, 0);
    }
}
