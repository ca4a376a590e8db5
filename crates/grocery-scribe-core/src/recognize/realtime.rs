//! Realtime WebSocket recognition backend.
//!
//! Streams microphone audio to a hosted realtime transcription API and
//! translates its event stream into [`SessionEvent`]s: transcription deltas
//! become interim updates, completed turns become finalized segments, and a
//! stop request commits the remaining audio and flushes trailing results
//! before `Ended` is emitted.

use crate::{
    audio::{AudioCapturer, Resampler},
    error::{CaptureError, CaptureResult},
    recognize::{SPOKEN_LANGUAGE, SessionEvent, SpeechBackend},
};

use std::{fmt, panic::Location, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use error_location::ErrorLocation;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
    time::timeout,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::header::{AUTHORIZATION, HeaderValue},
    },
};
use tracing::{debug, info, instrument, warn};

const WS_URL: &str = "wss://api.openai.com/v1/realtime?intent=transcription";
const DEFAULT_MODEL: &str = "gpt-4o-transcribe";

/// Sample rate the provider expects for PCM16 input.
const PROVIDER_SAMPLE_RATE: u32 = 24_000;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Silence window after the final commit. The provider finalizes pending
/// audio asynchronously; once nothing arrives for this long the session is
/// considered flushed.
const FINAL_FLUSH_WINDOW: Duration = Duration::from_secs(3);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsError = tokio_tungstenite::tungstenite::Error;

/// Configuration for the realtime recognition backend.
///
/// Constructed explicitly at process start and passed in — availability is
/// probed from this object, never from ambient environment state.
#[derive(Clone)]
pub struct RealtimeConfig {
    api_key: String,
    model: String,
}

impl RealtimeConfig {
    /// Configuration with the default transcription model.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the transcription model.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }
}

impl fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Continuous recognition over the provider's realtime WebSocket API.
#[derive(Debug)]
pub struct RealtimeBackend {
    config: RealtimeConfig,
}

impl RealtimeBackend {
    /// Create a backend from explicit configuration.
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SpeechBackend for RealtimeBackend {
    fn probe(&self) -> CaptureResult<()> {
        if self.config.api_key.trim().is_empty() {
            return Err(CaptureError::Unsupported {
                reason: "no recognition API key configured".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn start(
        self: Box<Self>,
        events: mpsc::Sender<SessionEvent>,
        stop: watch::Receiver<bool>,
    ) -> CaptureResult<()> {
        self.probe()?;

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (capturer, device_rate) = AudioCapturer::start(chunk_tx).await?;

        // Device rate rarely matches the provider's 24 kHz.
        let resampler = if device_rate == PROVIDER_SAMPLE_RATE {
            None
        } else {
            Some(Resampler::new(device_rate, PROVIDER_SAMPLE_RATE)?)
        };

        // If the stream fails to open, dropping the capturer stops the
        // microphone thread.
        let (write, read) = open_recognition_stream(&self.config).await?;

        info!(model = %self.config.model, "Recognition stream open");

        let task = SessionTask {
            write,
            read,
            capturer,
            resampler,
            chunk_rx,
            events,
            stop,
            interim: String::new(),
            stopping: false,
        };

        tokio::spawn(run_session(task));

        Ok(())
    }
}

// Provider wire messages.

#[derive(Serialize)]
struct SessionUpdate {
    #[serde(rename = "type")]
    msg_type: &'static str,
    session: SessionConfig,
}

#[derive(Serialize)]
struct SessionConfig {
    #[serde(rename = "type")]
    session_type: &'static str,
    audio: AudioSection,
}

#[derive(Serialize)]
struct AudioSection {
    input: AudioInput,
}

#[derive(Serialize)]
struct AudioInput {
    format: AudioFormat,
    transcription: TranscriptionSection,
    turn_detection: TurnDetection,
}

#[derive(Serialize)]
struct AudioFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    rate: u32,
}

#[derive(Serialize)]
struct TranscriptionSection {
    model: String,
    language: &'static str,
}

#[derive(Serialize)]
struct TurnDetection {
    #[serde(rename = "type")]
    detection_type: &'static str,
}

#[derive(Serialize)]
struct AudioAppend {
    #[serde(rename = "type")]
    msg_type: &'static str,
    audio: String,
}

#[derive(Serialize)]
struct AudioCommit {
    #[serde(rename = "type")]
    msg_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ServerEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    error: Option<ServerError>,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    message: String,
}

/// Connect, authenticate, configure the transcription session, and wait for
/// the server's confirmation.
#[instrument(skip_all)]
async fn open_recognition_stream(
    config: &RealtimeConfig,
) -> CaptureResult<(SplitSink<WsStream, Message>, SplitStream<WsStream>)> {
    let mut request = WS_URL
        .into_client_request()
        .map_err(|e| provider_error(format!("Invalid provider URL: {}", e)))?;

    let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
        .map_err(|e| provider_error(format!("Invalid API key header: {}", e)))?;
    request.headers_mut().insert(AUTHORIZATION, auth);

    let (ws_stream, _response) = timeout(CONNECT_TIMEOUT, connect_async(request))
        .await
        .map_err(|_| provider_error("connection timeout".to_string()))?
        .map_err(|e| provider_error(format!("Failed to connect: {}", e)))?;

    let (mut write, mut read) = ws_stream.split();

    let update = SessionUpdate {
        msg_type: "session.update",
        session: SessionConfig {
            session_type: "transcription",
            audio: AudioSection {
                input: AudioInput {
                    format: AudioFormat {
                        format_type: "audio/pcm",
                        rate: PROVIDER_SAMPLE_RATE,
                    },
                    transcription: TranscriptionSection {
                        model: config.model.clone(),
                        language: SPOKEN_LANGUAGE,
                    },
                    // Server-side VAD finalizes a segment at each pause,
                    // giving the continuous final/interim stream.
                    turn_detection: TurnDetection {
                        detection_type: "server_vad",
                    },
                },
            },
        },
    };

    let json = serde_json::to_string(&update)
        .map_err(|e| provider_error(format!("Failed to encode session config: {}", e)))?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| provider_error(format!("Failed to send session config: {}", e)))?;

    let confirmation = timeout(CONNECT_TIMEOUT, async {
        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    let event: ServerEvent = match serde_json::from_str(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            return Err(provider_error(format!("Unparseable server event: {}", e)));
                        }
                    };

                    if event.event_type == "error" {
                        let message = event
                            .error
                            .map(|e| e.message)
                            .unwrap_or_else(|| "unspecified provider error".to_string());
                        return Err(provider_error(message));
                    }

                    if event.event_type == "session.created"
                        || event.event_type == "session.updated"
                        || event.event_type == "transcription_session.updated"
                    {
                        return Ok(());
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(provider_error(
                        "connection closed during session setup".to_string(),
                    ));
                }
                Some(Err(e)) => {
                    return Err(provider_error(format!("WebSocket error during setup: {}", e)));
                }
                _ => {} // Ping/Pong/Binary
            }
        }
    })
    .await;

    match confirmation {
        Ok(Ok(())) => Ok((write, read)),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(provider_error("timeout during session setup".to_string())),
    }
}

#[track_caller]
fn provider_error(reason: String) -> CaptureError {
    CaptureError::Provider {
        reason,
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Everything one live session owns.
struct SessionTask {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    capturer: AudioCapturer,
    resampler: Option<Resampler>,
    chunk_rx: mpsc::UnboundedReceiver<Vec<f32>>,
    events: mpsc::Sender<SessionEvent>,
    stop: watch::Receiver<bool>,
    /// Accumulated interim text for the segment currently being spoken.
    interim: String,
    /// Set once a graceful stop begins; relaxes close handling.
    stopping: bool,
}

/// Select-loop input, split out so the arm handlers can borrow the whole
/// task mutably.
enum Input {
    Stop,
    Chunk(Option<Vec<f32>>),
    Message(Option<Result<Message, WsError>>),
}

async fn run_session(mut task: SessionTask) {
    if let Err(e) = task.run().await {
        warn!(error = ?e, "Recognition session failed");
        task.capturer.stop();
        let _ = task.events.send(SessionEvent::Failed(e)).await;
    }
}

impl SessionTask {
    async fn run(&mut self) -> CaptureResult<()> {
        loop {
            let input = tokio::select! {
                _ = self.stop.changed() => Input::Stop,
                chunk = self.chunk_rx.recv() => Input::Chunk(chunk),
                msg = self.read.next() => Input::Message(msg),
            };

            match input {
                Input::Stop => {
                    self.finish().await;
                    return Ok(());
                }
                Input::Chunk(Some(samples)) => self.send_audio(&samples).await?,
                // Microphone thread gone; flush what was captured.
                Input::Chunk(None) => {
                    self.finish().await;
                    return Ok(());
                }
                Input::Message(msg) => {
                    if !self.handle_message(msg).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Graceful shutdown: stop the microphone, push the audio tail, commit,
    /// and flush trailing results before emitting `Ended`.
    ///
    /// Errors here are logged, not surfaced — finalized segments already
    /// delivered are worth more than a late transport failure.
    async fn finish(&mut self) {
        self.stopping = true;
        self.capturer.stop();

        while let Ok(samples) = self.chunk_rx.try_recv() {
            if let Err(e) = self.send_audio(&samples).await {
                warn!(error = ?e, "Failed to send trailing audio");
                break;
            }
        }

        match self.resampler.as_mut().map(Resampler::flush).transpose() {
            Ok(tail) => {
                let tail = tail.unwrap_or_default();
                if !tail.is_empty()
                    && let Err(e) = self.send_pcm(&tail).await
                {
                    warn!(error = ?e, "Failed to send resampler tail");
                }
            }
            Err(e) => warn!(error = ?e, "Failed to flush resampler"),
        }

        let commit = AudioCommit {
            msg_type: "input_audio_buffer.commit",
        };
        match serde_json::to_string(&commit) {
            Ok(json) => {
                if let Err(e) = self.write.send(Message::Text(json.into())).await {
                    warn!(error = ?e, "Failed to commit audio buffer");
                }
            }
            Err(e) => warn!(error = ?e, "Failed to encode commit"),
        }

        // The provider finalizes pending audio asynchronously after the
        // commit; a silence window bounds the wait for trailing results.
        loop {
            match timeout(FINAL_FLUSH_WINDOW, self.read.next()).await {
                Err(_) => break, // silence — flushed
                Ok(msg) => match self.handle_message(msg).await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => {
                        warn!(error = ?e, "Provider error during final flush");
                        break;
                    }
                },
            }
        }

        let _ = self.write.send(Message::Close(None)).await;
        let _ = self.events.send(SessionEvent::Ended).await;

        info!("Recognition session ended");
    }

    async fn send_audio(&mut self, samples: &[f32]) -> CaptureResult<()> {
        let converted = match &mut self.resampler {
            Some(resampler) => resampler.process(samples)?,
            None => samples.to_vec(),
        };
        self.send_pcm(&converted).await
    }

    async fn send_pcm(&mut self, samples: &[f32]) -> CaptureResult<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let pcm16: Vec<i16> = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();
        let bytes: Vec<u8> = pcm16.iter().flat_map(|&s| s.to_le_bytes()).collect();

        let append = AudioAppend {
            msg_type: "input_audio_buffer.append",
            audio: BASE64.encode(&bytes),
        };

        let json = serde_json::to_string(&append)
            .map_err(|e| provider_error(format!("Failed to encode audio chunk: {}", e)))?;
        self.write
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| provider_error(format!("Failed to send audio chunk: {}", e)))
    }

    /// Translate one WebSocket message into session events.
    ///
    /// Returns `Ok(false)` when the session should end quietly (consumer
    /// gone, or the provider closed after a stop request).
    async fn handle_message(
        &mut self,
        msg: Option<Result<Message, WsError>>,
    ) -> CaptureResult<bool> {
        let text = match msg {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                if self.stopping {
                    return Ok(false);
                }
                return Err(provider_error(
                    "recognition stream closed unexpectedly".to_string(),
                ));
            }
            Some(Ok(_)) => return Ok(true), // Ping/Pong/Binary
            Some(Err(e)) => {
                if self.stopping {
                    warn!(error = %e, "WebSocket error during final flush");
                    return Ok(false);
                }
                return Err(provider_error(format!("WebSocket error: {}", e)));
            }
        };

        let event: ServerEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Unparseable server event, skipping");
                return Ok(true);
            }
        };

        match event.event_type.as_str() {
            "conversation.item.input_audio_transcription.delta" => {
                if let Some(delta) = event.delta {
                    self.interim.push_str(&delta);
                    if !self.emit(SessionEvent::InterimUpdate(self.interim.clone())).await {
                        return Ok(false);
                    }
                }
            }
            "conversation.item.input_audio_transcription.completed" => {
                if let Some(transcript) = event.transcript {
                    let mut segment = transcript;
                    // Segments carry no separator of their own; keep
                    // consecutive turns from fusing.
                    if !segment.is_empty() && !segment.ends_with(char::is_whitespace) {
                        segment.push(' ');
                    }
                    self.interim.clear();
                    if !self.emit(SessionEvent::FinalSegment(segment)).await {
                        return Ok(false);
                    }
                    if !self.emit(SessionEvent::InterimUpdate(String::new())).await {
                        return Ok(false);
                    }
                }
            }
            "error" => {
                let message = event
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "unspecified provider error".to_string());
                return Err(provider_error(message));
            }
            other => debug!(event_type = other, "Ignoring provider event"),
        }

        Ok(true)
    }

    /// False when the event consumer has gone away.
    async fn emit(&self, event: SessionEvent) -> bool {
        self.events.send(event).await.is_ok()
    }
}
