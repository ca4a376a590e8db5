use crate::error::{CaptureError, CaptureResult};

use std::{
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use error_location::ErrorLocation;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument};

/// Poll interval for the capture thread's shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Microphone capture streaming mono f32 chunks over a channel.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated thread
/// for the whole session. Each device callback downmixes the interleaved
/// frame data to mono and forwards it as one chunk; the recognition backend
/// consumes chunks from the receiving end in arrival order.
pub(crate) struct AudioCapturer {
    shutdown: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioCapturer {
    /// Start capturing on a dedicated thread.
    ///
    /// Resolves once the input stream is running, returning the capturer and
    /// the device sample rate (mono chunks are emitted at this rate).
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` when no input device exists; `PermissionDenied`
    /// when the device refuses to open a stream (the usual shape of an OS
    /// microphone-permission rejection).
    #[instrument(skip(chunks))]
    pub(crate) async fn start(
        chunks: mpsc::UnboundedSender<Vec<f32>>,
    ) -> CaptureResult<(Self, u32)> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let (ready_tx, ready_rx) = oneshot::channel::<CaptureResult<u32>>();

        let handle = thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || capture_thread(chunks, thread_shutdown, ready_tx))
            .map_err(|e| CaptureError::Provider {
                reason: format!("Failed to spawn capture thread: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let sample_rate = match ready_rx.await {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(CaptureError::PermissionDenied {
                    reason: "capture thread exited before the stream opened".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        info!(sample_rate, "Microphone capture started");

        Ok((
            Self {
                shutdown,
                thread: Some(handle),
            },
            sample_rate,
        ))
    }

    /// Stop capturing and join the capture thread.
    ///
    /// Chunks already sent remain in the channel; the recognition backend
    /// drains them before committing the final audio.
    #[instrument(skip(self))]
    pub(crate) fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Capture thread panicked during shutdown");
            } else {
                info!("Microphone capture stopped");
            }
        }
    }
}

impl Drop for AudioCapturer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the dedicated capture thread: owns the cpal stream end to end.
fn capture_thread(
    chunks: mpsc::UnboundedSender<Vec<f32>>,
    shutdown: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<CaptureResult<u32>>,
) {
    let setup = open_stream(chunks, Arc::clone(&shutdown));

    let stream = match setup {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    while !shutdown.load(Ordering::Acquire) {
        thread::sleep(SHUTDOWN_POLL);
    }

    // Dropping the stream stops the device callbacks.
    drop(stream);
    debug!("Capture thread exiting");
}

#[track_caller]
fn open_stream(
    chunks: mpsc::UnboundedSender<Vec<f32>>,
    shutdown: Arc<AtomicBool>,
) -> CaptureResult<(cpal::Stream, u32)> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or(CaptureError::DeviceUnavailable {
            location: ErrorLocation::from(Location::caller()),
        })?;

    let config = device
        .default_input_config()
        .map_err(|e| CaptureError::PermissionDenied {
            reason: format!("Failed to get input config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    info!(
        device_id = ?device.id(),
        sample_rate,
        channels,
        "Input device opened"
    );

    let stream_config: cpal::StreamConfig = config.into();

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // The shutdown flag is checked here so no chunk is emitted
                // after stop() returns, even if cpal fires one last callback.
                if shutdown.load(Ordering::Acquire) {
                    return;
                }
                let mono = downmix(data, channels);
                // Receiver gone means the session is tearing down.
                let _ = chunks.send(mono);
            },
            |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| CaptureError::PermissionDenied {
            reason: format!("Failed to build input stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    stream.play().map_err(|e| CaptureError::PermissionDenied {
        reason: format!("Failed to start input stream: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok((stream, sample_rate))
}

/// Average interleaved frames down to a single mono channel.
fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
