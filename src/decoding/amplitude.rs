//! Conversion of transcoded 16-bit PCM into amplified integer amplitudes.
//!
//! Every sample is widened to the top half of an `i32`, divided by 32767 and
//! scaled by [`HEIGHT_COEFFICIENT`]. The bucketizer's divisor of 65536 assumes
//! exactly this amplification.

use super::error::{DecodeError, Result};
use super::session::DecodeSession;
use hound::{SampleFormat, WavReader};
use std::path::Path;

/// Vertical fit factor applied after normalization.
pub const HEIGHT_COEFFICIENT: f64 = 2.5;

/// Samples read between cancellation checks.
const CHECK_INTERVAL: usize = 4096;

/// Decoded, amplified samples across all interleaved channels, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSampleBuffer {
    samples: Vec<i32>,
}

impl RawSampleBuffer {
    pub fn as_slice(&self) -> &[i32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Vec<i32>> for RawSampleBuffer {
    fn from(samples: Vec<i32>) -> Self {
        Self { samples }
    }
}

/// Amplifies one little-endian sample given as its two bytes.
pub fn amplify_bytes(low: u8, high: u8) -> i32 {
    amplify(i16::from_le_bytes([low, high]))
}

/// Amplifies one signed 16-bit sample.
///
/// The scaled value is truncated toward zero, matching an integer store of a
/// floating point product.
pub fn amplify(sample: i16) -> i32 {
    let widened = i32::from(sample) << 16;
    let normalized = widened / 32767;
    (f64::from(normalized) * HEIGHT_COEFFICIENT) as i32
}

/// Reads a 16-bit integer WAV file and amplifies every sample.
///
/// # Errors
/// - If the file is not a 16-bit integer PCM WAV
/// - If the WAV data is truncated or unreadable
/// - If the session is cancelled while reading
pub fn read_wav_amplitudes(path: &Path, session: &DecodeSession<'_>) -> Result<RawSampleBuffer> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(DecodeError::UnsupportedFormat(format!(
            "expected 16-bit integer PCM, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    tracing::debug!(
        "Reading amplitudes: {}Hz, {} channels, {} samples",
        spec.sample_rate,
        spec.channels,
        reader.len()
    );

    let mut samples = Vec::with_capacity(reader.len() as usize);
    for (index, sample) in reader.into_samples::<i16>().enumerate() {
        if index % CHECK_INTERVAL == 0 {
            session.checkpoint()?;
        }
        samples.push(amplify(sample?));
    }

    tracing::debug!("Finished reading {} amplitudes", samples.len());
    Ok(RawSampleBuffer { samples })
}
