//! Upload event stream payloads.
//!
//! Pipelines report progress over a channel instead of threading
//! progress callbacks through every async call; the UI (or any other
//! observer) subscribes to the receiver half.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use courier_shared::records::{MessageRecord, StoredFileEntry};
use courier_shared::types::{BatchId, SwarmReference};

/// Pipeline states, in forward order. `Failed` is reachable from any
/// non-terminal state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Encrypting,
    CapacitySelection,
    Storing,
    Delivering,
    Completed,
    Failed(FailureKind),
}

/// Why a pipeline reached `Failed`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Encryption,
    RecipientUnresolved,
    Network,
    Cancelled,
}

/// Non-fatal condition reported mid-flight.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum UploadWarning {
    /// Sponsorship failed or timed out; the upload continues against
    /// the zero-filled placeholder batch id.
    CapacityUnavailable { detail: String },
}

/// What a completed upload produced.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub reference: SwarmReference,
    /// Batch id the upload was accounted against; the placeholder when
    /// capacity was degraded.
    pub batch_id: BatchId,
    pub message: Option<MessageRecord>,
    pub stored: Option<StoredFileEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub enum UploadEvent {
    StateChanged(UploadState),
    Warning(UploadWarning),
    Completed(UploadReceipt),
    Failed { kind: FailureKind, message: String },
}

pub type EventSender = mpsc::UnboundedSender<UploadEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<UploadEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

pub(crate) fn emit(tx: &EventSender, event: UploadEvent) {
    // A dropped receiver just means nobody is watching
    if tx.send(event).is_err() {
        debug!("Upload event dropped: no subscriber");
    }
}
