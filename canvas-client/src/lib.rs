//! Canvas Client
//!
//! Client-side reconciliation for the placement gateway.
//!
//! A participant session renders each placement immediately as a provisional
//! mark, submits it with a locally generated idempotency key, and reconciles
//! the render set against the authoritative ledger snapshot returned by the
//! gateway:
//!
//! - [`CanvasClient`]: `reqwest` client for the HTTP gateway
//! - [`PlacementTransport`]: transport seam used by the reconciler
//! - [`Session`]: state machine, provisional marks, monotonic snapshot adoption
//! - [`SubmissionQueue`]: buffered batches with size/idle flush and bounded workers
//! - [`Reconciler`]: facade tying the above together

pub mod api;
pub mod error;
pub mod queue;
pub mod reconciler;
pub mod retry;
pub mod session;
pub mod transport;

pub use api::{
    CanvasClient, ColorAvailability, HealthInfo, PlacedMark, PlacementItem, Rejection, RevealInfo,
    StatsInfo, Submission, DEFAULT_API_URL,
};
pub use error::{ClientError, ClientResult};
pub use queue::{submit_with_retry, BatchResult, SubmissionPolicy, SubmissionQueue};
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use retry::{RetryPolicy, RetryStrategy};
pub use session::{MarkStatus, ReconcileEvent, RenderedMark, RollbackReason, Session, SessionState};
pub use transport::PlacementTransport;
