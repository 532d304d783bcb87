//! Audio decoding for waveform extraction.
//!
//! Turns an audio file of any container or codec into a [`RawSampleBuffer`]
//! of amplified 16-bit samples. The concrete decoder runs ffmpeg; the
//! [`PcmDecoder`] trait lets the job runner work against any other source.

pub mod amplitude;
pub mod error;
pub mod ffmpeg;
pub mod progress;
pub mod session;

use std::path::Path;

pub use amplitude::{amplify, RawSampleBuffer, HEIGHT_COEFFICIENT};
pub use error::DecodeError;
pub use ffmpeg::{find_ffmpeg, FfmpegDecoder, TargetFormat};
pub use session::{CancelFlag, DecodeSession, LogProgress, ProgressSink, TempArtifacts};

/// Converts an audio file into interleaved, amplified PCM samples.
///
/// Implementations create any intermediate files through
/// [`DecodeSession::temp_file`] so the job runner can remove them, and should
/// call [`DecodeSession::checkpoint`] between expensive steps.
pub trait PcmDecoder: Send + Sync {
    fn decode(
        &self,
        path: &Path,
        session: &mut DecodeSession<'_>,
    ) -> Result<RawSampleBuffer, DecodeError>;
}
