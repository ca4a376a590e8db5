use crate::{
    error::{CaptureError, CaptureResult, ExtractError, ExtractResult},
    extraction::{ExtractionTransport, ItemExtractor},
    lifecycle::{BackendFactory, LifecycleController, RecordingState},
    recognize::{SessionEvent, SpeechBackend},
};

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};

#[track_caller]
fn loc() -> ErrorLocation {
    ErrorLocation::from(std::panic::Location::caller())
}

#[derive(Clone)]
enum Step {
    Final(&'static str),
    Interim(&'static str),
    Ended,
    Fail(&'static str),
}

impl Step {
    fn into_event(self) -> SessionEvent {
        match self {
            Step::Final(text) => SessionEvent::FinalSegment(text.to_string()),
            Step::Interim(text) => SessionEvent::InterimUpdate(text.to_string()),
            Step::Ended => SessionEvent::Ended,
            Step::Fail(reason) => SessionEvent::Failed(CaptureError::Provider {
                reason: reason.to_string(),
                location: loc(),
            }),
        }
    }
}

/// Backend driven by a fixed script: `live` steps stream immediately,
/// `trailing` steps only after a stop request.
#[derive(Clone, Default)]
struct Script {
    unsupported: bool,
    deny_start: bool,
    live: Vec<Step>,
    trailing: Vec<Step>,
}

struct ScriptedBackend {
    script: Script,
}

#[async_trait]
impl SpeechBackend for ScriptedBackend {
    fn probe(&self) -> CaptureResult<()> {
        if self.script.unsupported {
            return Err(CaptureError::Unsupported {
                reason: "no provider in test environment".to_string(),
                location: loc(),
            });
        }
        Ok(())
    }

    async fn start(
        self: Box<Self>,
        events: mpsc::Sender<SessionEvent>,
        mut stop: watch::Receiver<bool>,
    ) -> CaptureResult<()> {
        if self.script.deny_start {
            return Err(CaptureError::PermissionDenied {
                reason: "denied by test".to_string(),
                location: loc(),
            });
        }

        let Script { live, trailing, .. } = self.script;
        tokio::spawn(async move {
            for step in live {
                let _ = events.send(step.into_event()).await;
            }
            let _ = stop.changed().await;
            for step in trailing {
                let _ = events.send(step.into_event()).await;
            }
        });

        Ok(())
    }
}

fn scripted(script: Script) -> BackendFactory {
    Box::new(move || {
        Box::new(ScriptedBackend {
            script: script.clone(),
        })
    })
}

#[derive(Clone)]
enum StubOutcome {
    Items(Vec<&'static str>),
    Timeout,
}

/// Extraction transport that records calls and returns a fixed outcome.
struct StubTransport {
    calls: Arc<Mutex<Vec<String>>>,
    outcome: StubOutcome,
}

#[async_trait]
impl ExtractionTransport for StubTransport {
    #[allow(clippy::unwrap_used)]
    async fn fetch_items(&self, transcript: &str) -> ExtractResult<Vec<String>> {
        self.calls.lock().unwrap().push(transcript.to_string());
        match &self.outcome {
            StubOutcome::Items(items) => Ok(items.iter().map(|s| s.to_string()).collect()),
            StubOutcome::Timeout => Err(ExtractError::Timeout { location: loc() }),
        }
    }
}

fn controller(
    script: Script,
    outcome: StubOutcome,
) -> (LifecycleController, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let transport = StubTransport {
        calls: Arc::clone(&calls),
        outcome,
    };
    let extractor = ItemExtractor::new(Box::new(transport));
    let controller = LifecycleController::new(scripted(script), extractor)
        .with_drain_grace(Duration::from_millis(200));
    (controller, calls)
}

const CONTACT: Option<&str> = Some("+919876543210");

async fn pump_events(controller: &mut LifecycleController, count: usize) {
    for _ in 0..count {
        if let Some(event) = controller.session_event().await {
            controller.apply_event(event).await;
        }
    }
}

async fn pump_until_settled(controller: &mut LifecycleController) {
    while controller.is_listening() {
        match controller.session_event().await {
            Some(event) => controller.apply_event(event).await,
            None => break,
        }
    }
}

/// WHAT: Starting without a contact number never leaves Idle
/// WHY: The settings store gates every recording cycle
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_no_contact_when_starting_then_stays_idle_with_message() {
    // Given: A controller with no configured contact
    let (mut controller, calls) = controller(Script::default(), StubOutcome::Items(vec![]));

    // When: Starting without a contact number
    let state = controller.start(None).await;

    // Then: No transition happened and the settings message is surfaced
    assert_eq!(state, RecordingState::Idle);
    assert_eq!(
        controller.message(),
        Some("Please set your WhatsApp number first.")
    );
    assert!(calls.lock().unwrap().is_empty());
}

/// WHAT: Finalized segments reach the extractor verbatim after stop
/// WHY: The accumulated transcript must be handed over unmodified
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_final_segments_when_stopping_then_transcript_extracted_verbatim() {
    // Given: A session scripted to emit two Hindi segments, then end
    let script = Script {
        live: vec![Step::Final("दूध "), Step::Final("चाहिए")],
        trailing: vec![Step::Ended],
        ..Script::default()
    };
    let (mut controller, calls) = controller(script, StubOutcome::Items(vec!["milk"]));

    // When: Recording, applying both segments, then stopping
    assert_eq!(controller.start(CONTACT).await, RecordingState::Listening);
    pump_events(&mut controller, 2).await;
    let state = controller.stop().await;

    // Then: The extractor received the exact snapshot and the list is shown
    assert_eq!(state, RecordingState::ShowingList);
    assert_eq!(calls.lock().unwrap().as_slice(), ["दूध चाहिए"]);
    assert_eq!(controller.items().len(), 1);
    assert_eq!(controller.items()[0].name, "milk");
}

/// WHAT: Interim text still provisional at stop is included in the snapshot
/// WHY: The last spoken words may never be finalized by the provider
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unfinalized_interim_when_stopping_then_included_in_snapshot() {
    // Given: A session whose last words only ever reach interim state
    let script = Script {
        live: vec![
            Step::Final("दूध "),
            Step::Interim("चाही"),
            Step::Interim("चाहिए"),
        ],
        trailing: vec![Step::Ended],
        ..Script::default()
    };
    let (mut controller, calls) = controller(script, StubOutcome::Items(vec!["milk"]));

    // When: Applying all three events, then stopping
    controller.start(CONTACT).await;
    pump_events(&mut controller, 3).await;
    controller.stop().await;

    // Then: The final snapshot is finalized text plus the last interim
    assert_eq!(calls.lock().unwrap().as_slice(), ["दूध चाहिए"]);
}

/// WHAT: A final segment arriving after the stop request is still included
/// WHY: Stop is not synchronous; the drain step must catch trailing results
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_trailing_final_after_stop_when_draining_then_segment_included() {
    // Given: A session that only finalizes the second segment after stop
    let script = Script {
        live: vec![Step::Final("दूध ")],
        trailing: vec![Step::Final("चाहिए"), Step::Ended],
        ..Script::default()
    };
    let (mut controller, calls) = controller(script, StubOutcome::Items(vec!["milk"]));

    // When: Applying the live segment and stopping
    controller.start(CONTACT).await;
    pump_events(&mut controller, 1).await;
    controller.stop().await;

    // Then: The trailing segment made it into the extracted transcript
    assert_eq!(calls.lock().unwrap().as_slice(), ["दूध चाहिए"]);
}

/// WHAT: Zero extracted items stays in ShowingList with a notice
/// WHY: An empty list is a valid result, not an error state
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_zero_items_when_extraction_succeeds_then_showing_list_with_notice() {
    // Given: A transcript that extracts to nothing
    let script = Script {
        live: vec![Step::Final("मौसम अच्छा है")],
        trailing: vec![Step::Ended],
        ..Script::default()
    };
    let (mut controller, _calls) = controller(script, StubOutcome::Items(vec![]));

    // When: Completing the cycle
    controller.start(CONTACT).await;
    pump_events(&mut controller, 1).await;
    let state = controller.stop().await;

    // Then: The state shows the (empty) list alongside an informational notice
    assert_eq!(state, RecordingState::ShowingList);
    assert!(controller.items().is_empty());
    assert_eq!(
        controller.message(),
        Some("No specific grocery items identified in the conversation.")
    );
}

/// WHAT: Reset from ShowingList returns to Idle with everything cleared
/// WHY: Each cycle owns its data; reset must drop all of it atomically
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_showing_list_when_resetting_then_idle_and_empty() {
    // Given: A completed cycle with items
    let script = Script {
        live: vec![Step::Final("दूध चाहिए")],
        trailing: vec![Step::Ended],
        ..Script::default()
    };
    let (mut controller, _calls) = controller(script, StubOutcome::Items(vec!["milk"]));
    controller.start(CONTACT).await;
    pump_events(&mut controller, 1).await;
    controller.stop().await;
    assert_eq!(controller.state(), RecordingState::ShowingList);

    // When: Resetting
    let state = controller.reset();

    // Then: Idle, with list, message, and transcript cleared
    assert_eq!(state, RecordingState::Idle);
    assert!(controller.items().is_empty());
    assert_eq!(controller.message(), None);
    assert_eq!(controller.transcript_snapshot(), "");
}

/// WHAT: Extraction failure enters Error and reset recovers to Idle
/// WHY: Every failure must leave a user-initiated path back to Idle
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_extraction_timeout_then_error_state_and_reset_recovers() {
    // Given: An extraction transport that times out
    let script = Script {
        live: vec![Step::Final("दूध चाहिए")],
        trailing: vec![Step::Ended],
        ..Script::default()
    };
    let (mut controller, _calls) = controller(script, StubOutcome::Timeout);

    // When: Completing the cycle
    controller.start(CONTACT).await;
    pump_events(&mut controller, 1).await;
    let state = controller.stop().await;

    // Then: Error with the timeout message, and reset returns to Idle
    assert_eq!(state, RecordingState::Error);
    assert_eq!(
        controller.message(),
        Some("The extraction request timed out. Please try again.")
    );

    assert_eq!(controller.reset(), RecordingState::Idle);
    assert_eq!(controller.message(), None);
}

/// WHAT: An empty transcript soft-resets to Idle without an extraction call
/// WHY: Empty input short-circuits before the extraction client is invoked
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_empty_transcript_when_stopping_then_soft_reset_to_idle() {
    // Given: A session that never produces speech
    let script = Script {
        trailing: vec![Step::Ended],
        ..Script::default()
    };
    let (mut controller, calls) = controller(script, StubOutcome::Items(vec!["milk"]));

    // When: Starting and immediately stopping
    controller.start(CONTACT).await;
    let state = controller.stop().await;

    // Then: Back to Idle with the no-speech notice; no network call happened
    assert_eq!(state, RecordingState::Idle);
    assert_eq!(
        controller.message(),
        Some("No speech detected. Please try again.")
    );
    assert!(calls.lock().unwrap().is_empty());
}

/// WHAT: A denied microphone puts the cycle into Error
/// WHY: Permission failures surface as a message, not a crash
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_denied_microphone_when_starting_then_error_state() {
    // Given: A backend that refuses to start
    let script = Script {
        deny_start: true,
        ..Script::default()
    };
    let (mut controller, _calls) = controller(script, StubOutcome::Items(vec![]));

    // When: Starting
    let state = controller.start(CONTACT).await;

    // Then: Error with the permission message
    assert_eq!(state, RecordingState::Error);
    assert_eq!(
        controller.message(),
        Some("Microphone access denied. Please check system permissions.")
    );
}

/// WHAT: An unsupported environment is reported through the Error state
/// WHY: The startup probe and the start path share one failure shape
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unsupported_environment_when_starting_then_error_state() {
    // Given: A backend whose probe fails
    let script = Script {
        unsupported: true,
        ..Script::default()
    };
    let (mut controller, _calls) = controller(script, StubOutcome::Items(vec![]));

    // When: Starting
    let state = controller.start(CONTACT).await;

    // Then: Error with the unsupported message
    assert_eq!(state, RecordingState::Error);
    let message = controller.message().unwrap_or_default().to_string();
    assert!(message.starts_with("Speech recognition is not available"));
}

/// WHAT: A session failure while listening processes what was captured
/// WHY: The captured transcript is still worth extracting after a provider loss
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_session_failure_while_listening_then_captured_text_processed() {
    // Given: A session that fails after one finalized segment
    let script = Script {
        live: vec![Step::Final("दूध "), Step::Fail("network down")],
        ..Script::default()
    };
    let (mut controller, calls) = controller(script, StubOutcome::Items(vec!["milk"]));

    // When: Pumping events until the failure lands
    controller.start(CONTACT).await;
    pump_until_settled(&mut controller).await;

    // Then: The captured text was extracted and the capture error retained
    assert_eq!(controller.state(), RecordingState::ShowingList);
    assert_eq!(calls.lock().unwrap().as_slice(), ["दूध "]);
    assert_eq!(
        controller.message(),
        Some("Speech recognition error: network down")
    );
}

/// WHAT: Retry from Error starts a fresh cycle, still gated on settings
/// WHY: Recovery is user-initiated and must respect the contact gate
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_error_state_when_retrying_then_fresh_cycle_starts() {
    // Given: A factory whose first backend fails and second succeeds
    let attempts = Arc::new(AtomicUsize::new(0));
    let factory_attempts = Arc::clone(&attempts);
    let factory: BackendFactory = Box::new(move || {
        let script = if factory_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Script {
                deny_start: true,
                ..Script::default()
            }
        } else {
            Script {
                trailing: vec![Step::Ended],
                ..Script::default()
            }
        };
        Box::new(ScriptedBackend { script })
    });
    let calls = Arc::new(Mutex::new(Vec::new()));
    let extractor = ItemExtractor::new(Box::new(StubTransport {
        calls,
        outcome: StubOutcome::Items(vec![]),
    }));
    let mut controller = LifecycleController::new(factory, extractor)
        .with_drain_grace(Duration::from_millis(200));

    assert_eq!(controller.start(CONTACT).await, RecordingState::Error);

    // When: Retrying without a contact, then with one
    assert_eq!(controller.retry(None).await, RecordingState::Error);
    assert_eq!(
        controller.message(),
        Some("Please set your WhatsApp number first.")
    );

    // Then: A configured retry reaches Listening on the fresh backend
    assert_eq!(controller.retry(CONTACT).await, RecordingState::Listening);
}

/// WHAT: Stop outside Listening is ignored
/// WHY: Command arrival is asynchronous; stale stops must not corrupt state
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_idle_controller_when_stopping_then_state_unchanged() {
    let (mut controller, _calls) = controller(Script::default(), StubOutcome::Items(vec![]));

    assert_eq!(controller.stop().await, RecordingState::Idle);
    assert_eq!(controller.state(), RecordingState::Idle);
}
