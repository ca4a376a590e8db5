//! Recording lifecycle controller.
//!
//! Owns the recording state machine for one cycle at a time: settings-gated
//! start, session event application, the explicit drain on stop, extraction
//! dispatch, and the reset/retry paths back to idle. All cycle-owned data
//! (state, transcript, items, status message) is reset atomically when a new
//! cycle starts.

use crate::{
    error::CaptureError,
    extraction::ItemExtractor,
    recognize::{CaptureSession, SessionEvent, SpeechBackend},
    transcript::TranscriptBuffer,
};

use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Constructs a fresh backend per cycle — ended and failed sessions are
/// never re-entered.
pub type BackendFactory = Box<dyn Fn() -> Box<dyn SpeechBackend> + Send>;

/// How long to wait for trailing session events after a stop request.
///
/// The provider may emit a final result batch asynchronously after stop;
/// reading the transcript without this wait would race against it.
const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(1500);

const SET_CONTACT_MESSAGE: &str = "Please set your WhatsApp number first.";
const NO_SPEECH_MESSAGE: &str = "No speech detected. Please try again.";
const NO_ITEMS_MESSAGE: &str = "No specific grocery items identified in the conversation.";

/// The recording state machine. Exactly one value is live at a time, owned
/// exclusively by the [`LifecycleController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Ready to start a new cycle.
    Idle,
    /// Waiting for the microphone and the recognition stream.
    RequestingPermission,
    /// Capture session live, transcript accumulating.
    Listening,
    /// Draining the session and running extraction.
    Processing,
    /// Extraction finished; the list (possibly empty) is presentable.
    ShowingList,
    /// The cycle failed; a message explains why.
    Error,
}

/// One extracted grocery item.
#[derive(Debug, Clone)]
pub struct ExtractedItem {
    /// Unique within a session.
    pub id: Uuid,
    /// Short item name in English.
    pub name: String,
}

/// Orchestrates capture start/stop, transcript accumulation, and the
/// extraction call, exposing list and message results to the presentation
/// layer.
pub struct LifecycleController {
    state: RecordingState,
    transcript: TranscriptBuffer,
    items: Vec<ExtractedItem>,
    message: Option<String>,
    session: Option<CaptureSession>,
    backends: BackendFactory,
    extractor: ItemExtractor,
    drain_grace: Duration,
}

impl LifecycleController {
    /// Build a controller over a backend factory and an extractor.
    pub fn new(backends: BackendFactory, extractor: ItemExtractor) -> Self {
        Self {
            state: RecordingState::Idle,
            transcript: TranscriptBuffer::new(),
            items: Vec::new(),
            message: None,
            session: None,
            backends,
            extractor,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    /// Override the drain grace period (tests use a short one).
    pub fn with_drain_grace(mut self, drain_grace: Duration) -> Self {
        self.drain_grace = drain_grace;
        self
    }

    /// Current recording state.
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// The extracted list from the last completed cycle.
    pub fn items(&self) -> &[ExtractedItem] {
        &self.items
    }

    /// Current status message (error or informational notice).
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The visible transcript: finalized text plus current interim.
    pub fn transcript_snapshot(&self) -> String {
        self.transcript.snapshot()
    }

    /// True while session events should be pumped.
    pub fn is_listening(&self) -> bool {
        matches!(self.state, RecordingState::Listening) && self.session.is_some()
    }

    /// Start a new recording cycle.
    ///
    /// Refused without a state transition when no contact identifier is
    /// configured — the caller should redirect to settings instead. Valid
    /// from `Idle` (start) and `Error` (retry).
    #[instrument(skip(self, contact), fields(has_contact = contact.is_some()))]
    pub async fn start(&mut self, contact: Option<&str>) -> RecordingState {
        if !matches!(self.state, RecordingState::Idle | RecordingState::Error) {
            warn!(state = ?self.state, "Start ignored in current state");
            return self.state;
        }

        if contact.is_none() {
            info!("Start refused: no contact number configured");
            self.message = Some(SET_CONTACT_MESSAGE.to_string());
            return self.state;
        }

        // Entry into a new cycle: everything cycle-owned resets atomically.
        self.transcript.reset();
        self.items.clear();
        self.message = None;
        self.session = None;

        self.state = RecordingState::RequestingPermission;

        match CaptureSession::start((self.backends)()).await {
            Ok(session) => {
                self.session = Some(session);
                self.state = RecordingState::Listening;
                info!("Listening");
            }
            Err(e) => {
                warn!(error = ?e, "Capture session failed to start");
                self.message = Some(e.user_message());
                self.state = RecordingState::Error;
            }
        }

        self.state
    }

    /// Retry after a failed cycle. Subject to the same settings gate as
    /// [`start`](Self::start).
    pub async fn retry(&mut self, contact: Option<&str>) -> RecordingState {
        if !matches!(self.state, RecordingState::Error) {
            warn!(state = ?self.state, "Retry ignored in current state");
            return self.state;
        }
        self.start(contact).await
    }

    /// Await the next session event. Gate calls on
    /// [`is_listening`](Self::is_listening); resolves to `None` otherwise.
    pub async fn session_event(&mut self) -> Option<SessionEvent> {
        match &mut self.session {
            Some(session) => session.next_event().await,
            None => None,
        }
    }

    /// Apply one session event, in arrival order.
    pub async fn apply_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::FinalSegment(text) => self.transcript.append_final(&text),
            SessionEvent::InterimUpdate(text) => self.transcript.set_interim(&text),
            // The provider ended the session on its own (e.g. no-speech
            // policy); process whatever was captured.
            SessionEvent::Ended => {
                debug!("Session ended by provider");
                self.stop().await;
            }
            SessionEvent::Failed(e) => self.handle_session_failure(e).await,
        }
    }

    /// Stop the current cycle: drain the session, snapshot the transcript,
    /// and run extraction.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> RecordingState {
        if !matches!(self.state, RecordingState::Listening) {
            warn!(state = ?self.state, "Stop ignored in current state");
            return self.state;
        }

        self.state = RecordingState::Processing;
        self.drain_session().await;
        self.finish_cycle().await
    }

    /// Reset back to idle, clearing the list, transcript, and message.
    /// Valid from `ShowingList` and `Error`.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> RecordingState {
        if matches!(
            self.state,
            RecordingState::RequestingPermission
                | RecordingState::Listening
                | RecordingState::Processing
        ) {
            warn!(state = ?self.state, "Reset ignored mid-cycle");
            return self.state;
        }

        self.transcript.reset();
        self.items.clear();
        self.message = None;
        self.session = None;
        self.state = RecordingState::Idle;

        self.state
    }

    /// A session failure while listening enters `Processing` with whatever
    /// was captured; the error message is retained for the presentation
    /// layer. The dead session is discarded — sessions are not re-entrant.
    async fn handle_session_failure(&mut self, error: CaptureError) {
        warn!(error = ?error, "Capture session failed");
        self.message = Some(error.user_message());

        if matches!(self.state, RecordingState::Listening) {
            self.state = RecordingState::Processing;
            self.finish_cycle().await;
        }
    }

    /// Consume trailing events until `Ended`, `Failed`, or the grace period
    /// lapses. This is the explicit drain step: a provider may deliver a
    /// final result batch after the stop request, and the transcript is not
    /// final until it has been applied.
    async fn drain_session(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };

        session.request_stop();

        let deadline = Instant::now() + self.drain_grace;
        while session.is_live() {
            match timeout_at(deadline, session.next_event()).await {
                Err(_) => {
                    warn!("Drain grace period elapsed before end-of-session");
                    break;
                }
                Ok(None) => break,
                Ok(Some(SessionEvent::FinalSegment(text))) => {
                    self.transcript.append_final(&text);
                }
                Ok(Some(SessionEvent::InterimUpdate(text))) => {
                    self.transcript.set_interim(&text);
                }
                Ok(Some(SessionEvent::Ended)) => break,
                Ok(Some(SessionEvent::Failed(e))) => {
                    warn!(error = ?e, "Session failed during drain");
                    self.message = Some(e.user_message());
                    break;
                }
            }
        }
    }

    /// Snapshot the transcript and run extraction. Entered from `Processing`
    /// only.
    async fn finish_cycle(&mut self) -> RecordingState {
        self.session = None;

        let text = self.transcript.snapshot();

        // Capture is over: interim text stops being provisional. Collapse it
        // into the finalized transcript so the visible text stays put.
        self.transcript.reset();
        self.transcript.append_final(&text);

        if text.trim().is_empty() {
            // Soft reset — empty input short-circuits before the extraction
            // client is ever invoked. A capture failure message, if any,
            // survives the reset.
            let notice = self
                .message
                .take()
                .unwrap_or_else(|| NO_SPEECH_MESSAGE.to_string());
            self.transcript.reset();
            self.items.clear();
            self.message = Some(notice);
            self.state = RecordingState::Idle;
            info!("Empty transcript, cycle soft-reset");
            return self.state;
        }

        info!(transcript_len = text.len(), "Transcript final, extracting items");

        match self.extractor.extract_items(&text).await {
            Ok(names) => {
                self.items = names
                    .into_iter()
                    .map(|name| ExtractedItem {
                        id: Uuid::new_v4(),
                        name,
                    })
                    .collect();

                if self.items.is_empty() {
                    // Informational, not an error — the state still shows
                    // the (empty) list.
                    self.message = Some(NO_ITEMS_MESSAGE.to_string());
                }

                self.state = RecordingState::ShowingList;
                info!(item_count = self.items.len(), "Extraction complete");
            }
            Err(e) => {
                warn!(error = ?e, retryable = e.is_retryable(), "Extraction failed");
                self.message = Some(e.user_message());
                self.state = RecordingState::Error;
            }
        }

        self.state
    }
}
