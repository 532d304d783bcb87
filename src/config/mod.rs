//! Configuration management for wavepane.
//!
//! Loads and saves panel and decoder settings from a TOML file in the
//! user's config directory.

pub mod file;

pub use file::{config_path, DecoderConfig, PanelConfig, WaveformConfig};
