//! The upload pipeline state machine.
//!
//! One [`UploadPipeline`] is instantiated per user action and walks
//! `Idle → Encrypting → CapacitySelection → Storing → Delivering →
//! Completed`, with `Failed` reachable from any non-terminal state.
//! Progress is reported on an event stream; no shared mutable state
//! crosses pipeline instances except the read-mostly ledger view.
//!
//! Failure policy: capacity trouble is absorbed (placeholder stamp plus
//! one warning event), store and delivery I/O failures are fatal to the
//! instance, and nothing is retried here — the caller re-invokes
//! [`UploadPipeline::start`] from scratch if it wants another attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use courier_shared::error::{CryptoError, MailboxError, NetworkError, ValidationError};
use courier_shared::records::FileRecord;
use courier_shared::types::{Subdomain, UploadMode};
use courier_store::stamps::StampRecord;
use courier_store::RecipientInfo;

use crate::events::{
    emit, event_channel, EventReceiver, EventSender, FailureKind, UploadEvent, UploadReceipt,
    UploadState, UploadWarning,
};
use crate::session::Session;

/// What the caller wants uploaded and how. Validated before the
/// machine leaves `Idle`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    pub mode: UploadMode,
    pub recipient: Option<Subdomain>,
}

impl UploadRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.data.is_empty() {
            return Err(ValidationError::MissingField("data"));
        }
        if self.filename.is_empty() {
            return Err(ValidationError::MissingField("filename"));
        }
        if self.mime_type.is_empty() {
            return Err(ValidationError::MissingField("mime_type"));
        }
        if self.mode == UploadMode::Send && self.recipient.is_none() {
            return Err(ValidationError::RecipientRequired);
        }
        Ok(())
    }
}

/// Terminal error of one pipeline run.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Encryption failed: {0}")]
    Encryption(#[from] CryptoError),

    #[error("Recipient could not be resolved: {0:?}")]
    RecipientUnresolved(String),

    #[error("Network failure: {0}")]
    Network(#[from] NetworkError),

    #[error("Upload cancelled")]
    Cancelled,
}

impl UploadError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::Encryption(_) => FailureKind::Encryption,
            Self::RecipientUnresolved(_) => FailureKind::RecipientUnresolved,
            Self::Network(_) => FailureKind::Network,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }
}

impl From<MailboxError> for UploadError {
    fn from(e: MailboxError) -> Self {
        match e {
            MailboxError::RecipientUnresolved(name) => Self::RecipientUnresolved(name),
            MailboxError::Network(e) => Self::Network(e),
        }
    }
}

/// Owner-held cancellation handle. Honored only while the pipeline is
/// in `Encrypting` or `CapacitySelection`; once storing has begun the
/// upload either completes or fails, because a partially stored blob
/// cannot be retracted.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub struct UploadPipeline {
    session: Session,
    events: EventSender,
    cancel: CancelToken,
    state: UploadState,
}

impl UploadPipeline {
    /// Create a pipeline and the event stream its owner subscribes to.
    pub fn new(session: Session) -> (Self, EventReceiver) {
        let (tx, rx) = event_channel();
        let pipeline = Self {
            session,
            events: tx,
            cancel: CancelToken::default(),
            state: UploadState::Idle,
        };
        (pipeline, rx)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Run the upload to a terminal state. Consumes the pipeline: a
    /// retry is a fresh `start` on a fresh instance, there is no
    /// resumable checkpoint.
    pub async fn start(mut self, request: UploadRequest) -> Result<UploadReceipt, UploadError> {
        match self.run(request).await {
            Ok(receipt) => {
                self.state = UploadState::Completed;
                info!(
                    reference = %receipt.reference.short(),
                    batch_id = %receipt.batch_id,
                    "Upload completed"
                );
                emit(&self.events, UploadEvent::Completed(receipt.clone()));
                Ok(receipt)
            }
            Err(e) => {
                let kind = e.kind();
                self.state = UploadState::Failed(kind);
                error!(error = %e, "Upload failed");
                emit(
                    &self.events,
                    UploadEvent::Failed {
                        kind,
                        message: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    async fn run(&mut self, request: UploadRequest) -> Result<UploadReceipt, UploadError> {
        request.validate()?;

        // Resolve the recipient before any side effect; an unknown
        // recipient must fail the pipeline with nothing stored.
        let recipient = match (&request.mode, &request.recipient) {
            (UploadMode::Send, Some(to)) => {
                let resolver = self.session.mailbox().resolver();
                Some(resolver.resolve(to).await?)
            }
            _ => None,
        };

        self.transition(UploadState::Encrypting);
        self.check_cancelled()?;
        let plaintext_size = request.data.len() as u64;
        let payload = self.encrypt(&request, recipient.as_ref())?;

        self.transition(UploadState::CapacitySelection);
        self.check_cancelled()?;
        let stamp = self.select_capacity().await;

        // Last point at which cancellation is honored
        self.check_cancelled()?;
        self.transition(UploadState::Storing);
        let reference = self.session.store().put(&payload).await?;
        let file = FileRecord::new(
            reference.clone(),
            &request.filename,
            &request.mime_type,
            plaintext_size,
        )?;
        self.session
            .ledger()
            .record_usage(&stamp.batch_id, payload.len() as u64)
            .await;

        self.transition(UploadState::Delivering);
        let from = self.session.identity().subdomain().clone();
        let (message, stored) = match (&request.mode, recipient) {
            (UploadMode::Send, Some(to)) => {
                let record = self
                    .session
                    .mailbox()
                    .send(&from, &to.subdomain, file)
                    .await?;
                (Some(record), None)
            }
            (UploadMode::Store, _) => {
                let entry = self.session.mailbox().store_self(&from, file).await;
                (None, Some(entry))
            }
            // Quick mode hands the reference straight back
            _ => (None, None),
        };

        Ok(UploadReceipt {
            reference,
            batch_id: stamp.batch_id,
            message,
            stored,
        })
    }

    fn encrypt(
        &self,
        request: &UploadRequest,
        recipient: Option<&RecipientInfo>,
    ) -> Result<Vec<u8>, UploadError> {
        let keys = self.session.identity().keys();
        match (&request.mode, recipient) {
            (UploadMode::Send, Some(to)) => {
                Ok(keys.encrypt_for_recipient(&request.data, &to.public_key)?)
            }
            // Unreachable after validation; kept as a typed failure
            (UploadMode::Send, None) => Err(ValidationError::RecipientRequired.into()),
            (UploadMode::Store, _) => Ok(keys.encrypt_for_self(&request.data)?),
            // Quick-share stores the content in the clear
            (UploadMode::Quick, _) => Ok(request.data.clone()),
        }
    }

    /// Pick a stamp for this upload: a usable one from the ledger,
    /// else fresh sponsored capacity, else the placeholder (with one
    /// warning event). Never fails the pipeline.
    async fn select_capacity(&mut self) -> StampRecord {
        let ledger = self.session.ledger();
        if let Some(stamp) = ledger.select_usable_stamp().await {
            return stamp;
        }

        match ledger
            .request_sponsored_stamp(self.session.sponsor_timeout())
            .await
        {
            Ok(stamp) => stamp,
            Err(e) => {
                warn!(error = %e, "Capacity degraded; continuing with placeholder stamp");
                emit(
                    &self.events,
                    UploadEvent::Warning(UploadWarning::CapacityUnavailable {
                        detail: e.to_string(),
                    }),
                );
                StampRecord::placeholder()
            }
        }
    }

    fn transition(&mut self, next: UploadState) {
        self.state = next.clone();
        emit(&self.events, UploadEvent::StateChanged(next));
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        Ok(())
    }
}
