//! Compute and print the amplitude profile of one audio file.

use crate::config::WaveformConfig;
use crate::decoding::{FfmpegDecoder, LogProgress};
use crate::waveform::{
    AmplitudeProfile, JobError, JobRequest, PainterSwitch, ServiceOptions, WaveformService,
};
use anyhow::anyhow;
use std::path::PathBuf;
use std::sync::Arc;

/// Decodes `file` and prints one amplitude per column.
///
/// # Arguments
/// * `file` - Audio file of any format ffmpeg can read
/// * `width` - Column count; defaults to `panel.width` from the config
/// * `json` - Print a JSON array instead of one column per line
///
/// # Errors
/// - If the file does not exist
/// - If ffmpeg cannot be found
/// - If decoding fails or is interrupted
pub async fn handle_profile(
    file: PathBuf,
    width: Option<usize>,
    json: bool,
) -> Result<(), anyhow::Error> {
    tracing::info!("=== wavepane Profile Command ===");

    let file = std::fs::canonicalize(&file)
        .map_err(|e| anyhow!("Audio file not found: {} ({e})", file.display()))?;

    let config = WaveformConfig::load()?;
    let width = width.unwrap_or(config.panel.width);
    if width == 0 {
        return Err(anyhow!("Width must be at least 1"));
    }

    let decoder = FfmpegDecoder::locate(config.decoder.ffmpeg_path.as_deref())?;
    tracing::debug!("Using ffmpeg at {}", decoder.ffmpeg_path().display());

    let options = ServiceOptions {
        temp_dir: config.decoder.temp_dir(),
        progress: Arc::new(LogProgress),
    };
    let service = WaveformService::with_options(
        Arc::new(decoder),
        Arc::new(PainterSwitch::new()),
        width,
        options,
    );

    let interrupt = service.clone();
    ctrlc::set_handler(move || interrupt.stop())
        .map_err(|e| anyhow!("Failed to install Ctrl-C handler: {e}"))?;

    let profile = match service.submit(JobRequest::decode(&file)).outcome().await {
        Ok(profile) => profile,
        Err(JobError::Cancelled) => return Err(anyhow!("Interrupted")),
        Err(e) => return Err(anyhow!("Failed to compute waveform for {}: {e}", file.display())),
    };

    if json {
        println!("{}", serde_json::to_string(&*profile)?);
    } else {
        for line in format_columns(&profile, config.panel.height) {
            println!("{line}");
        }
    }

    Ok(())
}

/// One line per column: index, amplitude and stroke half-height in pixels.
pub fn format_columns(profile: &AmplitudeProfile, height: usize) -> Vec<String> {
    profile
        .iter()
        .enumerate()
        .map(|(column, &value)| {
            let pixels = (value * height as f32) as i32;
            format!("{column}\t{value:.6}\t{pixels}")
        })
        .collect()
}
