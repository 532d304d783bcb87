//! Configuration file management for wavepane.
//!
//! Settings live in `~/.config/wavepane/wavepane.toml`. Every field has a
//! default, so a missing file or a partial file is valid.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Waveform panel geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Number of pixel columns; every profile has exactly this many values
    #[serde(default = "default_width")]
    pub width: usize,
    /// Pixel rows, used to scale text output
    #[serde(default = "default_height")]
    pub height: usize,
}

fn default_width() -> usize {
    1024
}

fn default_height() -> usize {
    128
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Explicit ffmpeg binary; searched for when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
    /// Directory for temporary files; the system temp dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

impl DecoderConfig {
    /// Temporary directory to use, falling back to the system default.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveformConfig {
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

impl WaveformConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// Returns defaults when the file does not exist.
    ///
    /// # Errors
    /// - If the home directory cannot be determined
    /// - If the file exists but cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from an explicit path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Parses TOML configuration text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: WaveformConfig = toml::from_str(content)?;
        if config.panel.width == 0 {
            return Err(anyhow!("panel.width must be at least 1"));
        }
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&config_path()?)
    }

    /// Saves configuration to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Path of the config file. The file itself may not exist.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join("wavepane").join("wavepane.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = WaveformConfig::parse("").unwrap();
        assert_eq!(config, WaveformConfig::default());
        assert_eq!(config.panel.width, 1024);
        assert_eq!(config.panel.height, 128);
        assert_eq!(config.decoder.ffmpeg_path, None);
    }

    #[test]
    fn test_partial_file() {
        let config = WaveformConfig::parse(
            r#"
            [panel]
            width = 640

            [decoder]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            "#,
        )
        .unwrap();
        assert_eq!(config.panel.width, 640);
        assert_eq!(config.panel.height, 128);
        assert_eq!(
            config.decoder.ffmpeg_path,
            Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
        );
        assert_eq!(config.decoder.temp_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_zero_width_rejected() {
        assert!(WaveformConfig::parse("[panel]\nwidth = 0\n").is_err());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(WaveformConfig::parse("[panel\nwidth = ").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wavepane.toml");

        let mut config = WaveformConfig::default();
        config.panel.width = 300;
        config.decoder.temp_dir = Some(dir.path().to_path_buf());
        config.save_to(&path).unwrap();

        assert_eq!(WaveformConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = WaveformConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, WaveformConfig::default());
    }
}
