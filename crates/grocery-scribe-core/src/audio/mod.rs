mod capture;
mod resampler;

pub(crate) use {capture::AudioCapturer, resampler::Resampler};
