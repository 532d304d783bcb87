//! Command handlers for the wavepane binary.
//!
//! # Commands
//! - `profile`: Decode a file and print its amplitude profile
//! - `config`: Show or edit the configuration file
//! - `logs`: Display recent log entries

pub mod config;
pub mod logs;
pub mod profile;

pub use config::handle_config;
pub use logs::handle_logs;
pub use profile::handle_profile;
