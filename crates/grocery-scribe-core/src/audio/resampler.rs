use crate::error::{CaptureError, CaptureResult};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

/// Streaming mono sample-rate converter.
///
/// Device chunks arrive with arbitrary lengths, so samples are staged in a
/// carry buffer and processed in fixed-size frames; `flush` pads and drains
/// the remainder when the session stops.
pub(crate) struct Resampler {
    resampler: Fft<f32>,
    pending: Vec<f32>,
    input_rate: u32,
    output_rate: u32,
    chunk_size: usize,
}

impl Resampler {
    #[track_caller]
    #[instrument]
    pub(crate) fn new(input_rate: u32, output_rate: u32) -> CaptureResult<Self> {
        let chunk_size = 1024;
        let sub_chunks = 2;

        let resampler = Fft::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            chunk_size,
            sub_chunks,
            1, // mono
            FixedSync::Input,
        )
        .map_err(|e| CaptureError::Provider {
            reason: format!("Failed to create resampler: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(input_rate, output_rate, chunk_size, "Resampler initialized");

        Ok(Self {
            resampler,
            pending: Vec::with_capacity(chunk_size * 2),
            input_rate,
            output_rate,
            chunk_size,
        })
    }

    /// Feed one capture chunk, returning whatever full frames resample to.
    ///
    /// Samples that do not fill a whole frame stay in the carry buffer for
    /// the next call.
    #[track_caller]
    #[instrument(skip(self, samples))]
    pub(crate) fn process(&mut self, samples: &[f32]) -> CaptureResult<Vec<f32>> {
        self.pending.extend_from_slice(samples);

        let mut output = Vec::new();
        while self.pending.len() >= self.chunk_size {
            let frame: Vec<f32> = self.pending.drain(..self.chunk_size).collect();
            self.resample_frame(&frame, &mut output)?;
        }

        Ok(output)
    }

    /// Pad and drain the carry buffer at end of session.
    #[track_caller]
    #[instrument(skip(self))]
    pub(crate) fn flush(&mut self) -> CaptureResult<Vec<f32>> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut frame: Vec<f32> = self.pending.drain(..).collect();
        let real_len = frame.len();
        frame.resize(self.chunk_size, 0.0);

        let mut output = Vec::new();
        self.resample_frame(&frame, &mut output)?;

        // Trim the padding back off at the output rate.
        let real_out =
            (real_len as f64 * self.output_rate as f64 / self.input_rate as f64) as usize;
        output.truncate(real_out);

        debug!(flushed = output.len(), "Resampler flushed");

        Ok(output)
    }

    #[track_caller]
    fn resample_frame(&mut self, frame: &[f32], output: &mut Vec<f32>) -> CaptureResult<()> {
        let input_adapter =
            InterleavedSlice::new(frame, 1, self.chunk_size).map_err(|e| CaptureError::Provider {
                reason: format!("Failed to create input adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let output_frames = self.resampler.output_frames_max();
        let mut output_chunk = vec![0.0f32; output_frames];

        let mut output_adapter = InterleavedSlice::new_mut(&mut output_chunk, 1, output_frames)
            .map_err(|e| CaptureError::Provider {
                reason: format!("Failed to create output adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let (_input_frames, output_frames_written) = self
            .resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, None)
            .map_err(|e| CaptureError::Provider {
                reason: format!("Resampling failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        output.extend_from_slice(&output_chunk[..output_frames_written]);

        Ok(())
    }
}
