//! # courier-client
//!
//! The user-facing orchestration layer: a per-login [`Session`], the
//! [`UploadPipeline`] state machine that drives encrypt → capacity →
//! store → deliver, its event stream, and the legacy pin compatibility
//! shim.

pub mod compat;
pub mod events;
pub mod pipeline;
pub mod session;

use tracing_subscriber::{fmt, EnvFilter};

pub use compat::{PinCompat, PinStatus};
pub use events::{EventReceiver, UploadEvent, UploadReceipt, UploadState, UploadWarning};
pub use pipeline::{CancelToken, UploadError, UploadPipeline, UploadRequest};
pub use session::Session;

/// Initialise tracing for binaries embedding the client.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("courier_client=debug,courier_store=debug,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
