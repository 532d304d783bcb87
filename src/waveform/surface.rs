//! Contract with the component that paints the profile.

use super::bucketize::AmplitudeProfile;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The rendering side of a waveform panel.
///
/// The job runner stops the painter before a new job starts and restarts it
/// once a fresh profile has been published.
pub trait WaveformSurface: Send + Sync {
    fn stop_painter(&self);
    fn start_painter(&self);
}

/// Surface that only tracks whether painting is enabled.
#[derive(Debug, Default)]
pub struct PainterSwitch {
    painting: AtomicBool,
}

impl PainterSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_painting(&self) -> bool {
        self.painting.load(Ordering::SeqCst)
    }
}

impl WaveformSurface for PainterSwitch {
    fn stop_painter(&self) {
        self.painting.store(false, Ordering::SeqCst);
        tracing::debug!("Painter stopped");
    }

    fn start_painter(&self) {
        self.painting.store(true, Ordering::SeqCst);
        tracing::debug!("Painter started");
    }
}

/// What a painter reads for one frame.
#[derive(Debug, Clone)]
pub struct PanelFrame {
    pub profile: Arc<AmplitudeProfile>,
    /// Playback cursor column, always `<= profile.width()`
    pub cursor: usize,
}
