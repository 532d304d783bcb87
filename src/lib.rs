//! Fixed-width waveform extraction.
//!
//! Decodes an audio file through ffmpeg, reduces its samples to exactly one
//! amplitude per pixel column, and runs that pipeline as a cancellable,
//! single-flight background job.

pub mod app;
pub mod commands;
pub mod config;
pub mod decoding;
pub mod logging;
pub mod waveform;

pub use decoding::{DecodeError, FfmpegDecoder, PcmDecoder, RawSampleBuffer};
pub use waveform::{
    bucketize, AmplitudeProfile, JobError, JobKind, JobRequest, JobState, WaveformService,
    WaveformSurface,
};
