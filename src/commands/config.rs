//! Show or edit the configuration file.

use crate::config::{config_path, WaveformConfig};
use std::process::Command;

/// Prints the effective configuration, or opens the config file in an editor.
///
/// A missing config file is written with default values before editing.
///
/// # Errors
/// - If the config file cannot be read, parsed or created
/// - If no editor can be found or the editor fails
pub fn handle_config(show: bool) -> anyhow::Result<()> {
    let path = config_path()?;

    if show {
        let config = WaveformConfig::load_from(&path)?;
        println!("# {}", path.display());
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    if !path.exists() {
        WaveformConfig::default().save_to(&path)?;
    }

    tracing::info!("Opening config file: {}", path.display());
    let editor = find_editor()?;
    tracing::debug!("Using editor: {}", editor);

    let status = Command::new(&editor).arg(&path).status().map_err(|e| {
        anyhow::anyhow!("Failed to open editor '{editor}': {e}")
    })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    // Surface mistakes right away instead of on the next run.
    WaveformConfig::load_from(&path)?;
    Ok(())
}

/// Tries `$EDITOR`, then nano, then vi.
fn find_editor() -> anyhow::Result<String> {
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    ["nano", "vi"]
        .into_iter()
        .find(|editor| {
            Command::new("which")
                .arg(editor)
                .output()
                .map(|output| output.status.success())
                .unwrap_or(false)
        })
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("No editor found. Please set the $EDITOR environment variable."))
}
