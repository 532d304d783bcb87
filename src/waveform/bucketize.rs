//! Reduction of a decoded sample sequence to one amplitude per pixel column.
//!
//! The divisor is calibrated against the amplified sample range produced by
//! [`crate::decoding::amplitude`], so the two stages must change together.

use serde::Serialize;
use std::ops::Deref;

/// Divisor applied to every absolute sample before averaging.
pub const AMPLITUDE_DIVISOR: f32 = 65536.0;

/// Level of the flat line shown before any track has been processed.
pub const IDLE_WAVE_LEVEL: f32 = 0.288_021_48;

/// Fixed-width amplitude envelope, one value per pixel column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AmplitudeProfile {
    values: Vec<f32>,
}

impl AmplitudeProfile {
    /// Flat idle line of `width` columns.
    pub fn idle(width: usize) -> Self {
        Self {
            values: vec![IDLE_WAVE_LEVEL; width],
        }
    }

    /// Profile of `width` zero columns.
    pub fn silent(width: usize) -> Self {
        Self {
            values: vec![0.0; width],
        }
    }

    /// Number of pixel columns.
    pub fn width(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

impl Deref for AmplitudeProfile {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.values
    }
}

impl From<Vec<f32>> for AmplitudeProfile {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Reduces `samples` to exactly `width` averaged amplitudes.
///
/// Samples are split into `width` equal buckets of `len / width` samples.
/// Samples past `width * (len / width)` are ignored rather than folded into
/// the last bucket, and fewer samples than columns yields all zeros.
pub fn bucketize(samples: &[i32], width: usize) -> AmplitudeProfile {
    match bucketize_until(samples, width, || true) {
        Some(profile) => profile,
        // The predicate never stops the reduction.
        None => AmplitudeProfile::silent(width),
    }
}

/// Same reduction as [`bucketize`], polling `keep_going` before each column.
///
/// Returns `None` as soon as `keep_going` reports false; a partially filled
/// profile is never returned.
pub fn bucketize_until<F>(samples: &[i32], width: usize, keep_going: F) -> Option<AmplitudeProfile>
where
    F: Fn() -> bool,
{
    if width == 0 {
        return Some(AmplitudeProfile::silent(0));
    }

    let samples_per_bucket = samples.len() / width;
    if samples_per_bucket == 0 {
        return Some(AmplitudeProfile::silent(width));
    }

    let mut values = Vec::with_capacity(width);
    for bucket in samples.chunks_exact(samples_per_bucket).take(width) {
        if !keep_going() {
            return None;
        }

        let sum = bucket
            .iter()
            .fold(0.0f32, |acc, &s| acc + s.unsigned_abs() as f32 / AMPLITUDE_DIVISOR);
        values.push(sum / samples_per_bucket as f32);
    }

    Some(AmplitudeProfile { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_width_matches_request() {
        let samples: Vec<i32> = (0..10_007).map(|i| (i * 37) % 70_000 - 35_000).collect();
        for width in [1, 2, 3, 17, 640, 10_007] {
            assert_eq!(bucketize(&samples, width).width(), width);
        }
    }

    #[test]
    fn test_zero_width_is_empty() {
        assert!(bucketize(&[1, 2, 3], 0).is_empty());
        assert!(bucketize(&[], 0).is_empty());
    }

    #[test]
    fn test_fewer_samples_than_columns_is_silent() {
        let profile = bucketize(&[65_536, -65_536, 12], 10);
        assert_eq!(profile.values(), &[0.0; 10]);

        let profile = bucketize(&[], 4);
        assert_eq!(profile.values(), &[0.0; 4]);
    }

    #[test]
    fn test_silence() {
        let profile = bucketize(&[0; 1000], 10);
        assert_eq!(profile.values(), &[0.0; 10]);
    }

    #[test]
    fn test_full_scale_alternating() {
        let samples: Vec<i32> = std::iter::repeat([65_536, -65_536])
            .take(2000)
            .flatten()
            .collect();
        let profile = bucketize(&samples, 4);
        assert_eq!(profile.values(), &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_trailing_samples_are_dropped() {
        // 7 samples over 3 columns: buckets of 2, the seventh sample is ignored.
        let samples = [65_536, 65_536, 32_768, 32_768, 0, 0, 6_553_600];
        let profile = bucketize(&samples, 3);
        assert_eq!(profile.values(), &[1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_bucket_average_uses_absolute_values() {
        let profile = bucketize(&[-131_072, 0, 65_536, -65_536], 2);
        assert_eq!(profile.values(), &[1.0, 1.0]);
    }

    #[test]
    fn test_deterministic() {
        let samples: Vec<i32> = (0..50_000).map(|i| (i * 7919) % 163_840 - 81_920).collect();
        let first = bucketize(&samples, 333);
        let second = bucketize(&samples, 333);
        let first_bits: Vec<u32> = first.iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u32> = second.iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_stops_between_columns() {
        let samples = vec![65_536; 100];
        let polls = Cell::new(0);
        let result = bucketize_until(&samples, 10, || {
            polls.set(polls.get() + 1);
            polls.get() <= 3
        });
        assert!(result.is_none());
        assert_eq!(polls.get(), 4);
    }

    #[test]
    fn test_idle_profile() {
        let profile = AmplitudeProfile::idle(5);
        assert_eq!(profile.width(), 5);
        assert!(profile.iter().all(|&v| v == IDLE_WAVE_LEVEL));
    }
}
