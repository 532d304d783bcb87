//! Errors raised while decoding audio into PCM samples.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning an audio file into PCM samples
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Source file does not exist
    #[error("Audio file not found: {0}")]
    SourceMissing(PathBuf),

    /// Container or codec the transcoder cannot read
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// No usable ffmpeg binary
    #[error("{0}")]
    TranscoderMissing(String),

    /// ffmpeg exited unsuccessfully for another reason
    #[error("ffmpeg exited with {code:?}: {message}")]
    Transcoder { code: Option<i32>, message: String },

    /// I/O error while copying, spawning or reading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transcoded WAV could not be parsed
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// The job owning this decode was cancelled
    #[error("Decode cancelled")]
    Cancelled,
}

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;
