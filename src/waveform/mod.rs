//! Waveform extraction for a fixed-width panel.
//!
//! Reduces decoded samples to one amplitude per pixel column and runs the
//! decode and reduce pipeline as a cancellable background job.

pub mod bucketize;
pub mod error;
pub mod job;
pub mod service;
pub mod surface;

pub use bucketize::{bucketize, bucketize_until, AmplitudeProfile, AMPLITUDE_DIVISOR, IDLE_WAVE_LEVEL};
pub use error::JobError;
pub use job::{JobHandle, JobId, JobKind, JobOutcome, JobRequest, JobState, JobStatus};
pub use service::{ServiceOptions, WaveformService};
pub use surface::{PainterSwitch, PanelFrame, WaveformSurface};
