use crate::{
    error::CaptureResult,
    recognize::{SessionEvent, SpeechBackend},
};

use tokio::sync::{mpsc, watch};
use tracing::{info, instrument};

/// Capacity of the session event channel.
///
/// Recognition events are small and applied immediately by the consumer;
/// 64 absorbs a burst of trailing results during drain without backpressure.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle of one capture session.
///
/// No state is re-entrant: an `Ended` or `Failed` session is discarded and a
/// new one constructed to record again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed but not yet started.
    Idle,
    /// Waiting for the microphone and the provider stream.
    Starting,
    /// Recognition is live; events are flowing.
    Active,
    /// Gracefully ended after a stop request.
    Ended,
    /// Dead after an unrecoverable provider failure.
    Failed,
}

/// One continuous run of speech recognition, from start to termination.
///
/// Owns the receiving end of the event stream. The consumer pulls events
/// with [`next_event`](CaptureSession::next_event) and requests graceful
/// termination with [`request_stop`](CaptureSession::request_stop); trailing
/// events may still arrive afterwards, until [`SessionEvent::Ended`].
pub struct CaptureSession {
    state: SessionState,
    events: mpsc::Receiver<SessionEvent>,
    stop: watch::Sender<bool>,
}

impl CaptureSession {
    /// Start a session on the given backend.
    ///
    /// Runs the backend's availability probe, then waits for the microphone
    /// and the provider stream to come up.
    ///
    /// # Errors
    ///
    /// `Unsupported`, `PermissionDenied`, or `DeviceUnavailable` from the
    /// backend; the session never reaches `Active` on failure.
    #[instrument(skip(backend))]
    pub async fn start(backend: Box<dyn SpeechBackend>) -> CaptureResult<Self> {
        backend.probe()?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = watch::channel(false);

        backend.start(event_tx, stop_rx).await?;

        info!("Capture session active");

        Ok(Self {
            state: SessionState::Active,
            events: event_rx,
            stop: stop_tx,
        })
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while events may still arrive.
    pub fn is_live(&self) -> bool {
        matches!(self.state, SessionState::Starting | SessionState::Active)
    }

    /// Receive the next event, updating session state on termination.
    ///
    /// Returns `None` once the backend is gone and all events are consumed.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let event = self.events.recv().await;

        match &event {
            Some(SessionEvent::Ended) => self.state = SessionState::Ended,
            Some(SessionEvent::Failed(_)) => self.state = SessionState::Failed,
            // Backend dropped its sender without a terminal event; the
            // session cannot produce anything further.
            None => {
                if self.is_live() {
                    self.state = SessionState::Ended;
                }
            }
            _ => {}
        }

        event
    }

    /// Request graceful termination.
    ///
    /// Not synchronous: the provider may emit a final result batch after
    /// this call. Consumers must keep pulling events until
    /// [`SessionEvent::Ended`] or a bounded grace period elapses.
    pub fn request_stop(&self) {
        let _ = self.stop.send(true);
    }
}
