//! Continuous speech recognition sessions.
//!
//! A [`CaptureSession`] wraps a streaming recognition backend and exposes a
//! typed event stream: finalized segments, wholesale interim updates, an
//! explicit end-of-session signal, and a terminal failure. Stopping is
//! graceful — trailing events may arrive after a stop request, and callers
//! must drain them before treating the transcript as final.

mod realtime;
mod session;

pub use {
    realtime::{RealtimeBackend, RealtimeConfig},
    session::{CaptureSession, SessionState},
};

use crate::error::{CaptureError, CaptureResult};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

/// Spoken language sent to the recognition provider.
///
/// Fixed by design — the capture flow is tuned for Hindi kitchen
/// conversations and the extraction prompt assumes it.
pub const SPOKEN_LANGUAGE: &str = "hi";

/// Events emitted by a capture session, strictly in arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// A segment the provider will not revise further. Appended to the
    /// transcript in the order received.
    FinalSegment(String),
    /// Provisional text for the segment currently being spoken. Replaces
    /// the previous interim text wholesale.
    InterimUpdate(String),
    /// Graceful end of session. No further events follow.
    Ended,
    /// Unrecoverable provider failure. The session is dead and must be
    /// discarded; a new one is constructed by the next recording cycle.
    Failed(CaptureError),
}

/// A continuous, streaming recognition provider.
///
/// Implementations acquire their own input (microphone, scripted fixture)
/// and push [`SessionEvent`]s until stopped or failed. The shipped backend
/// is [`RealtimeBackend`].
#[async_trait]
pub trait SpeechBackend: Send + 'static {
    /// One-time availability check, run at process start.
    ///
    /// # Errors
    ///
    /// `Unsupported` when recognition can never work in this environment
    /// (e.g. no provider credentials configured).
    fn probe(&self) -> CaptureResult<()>;

    /// Acquire the input device, open the recognition stream, and begin
    /// emitting events.
    ///
    /// Resolves once recognition is live; event delivery continues on a
    /// background task until `stop` flips or the provider fails.
    async fn start(
        self: Box<Self>,
        events: mpsc::Sender<SessionEvent>,
        stop: watch::Receiver<bool>,
    ) -> CaptureResult<()>;
}
