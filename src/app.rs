//! Command-line parsing and routing.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Fixed-width waveform profiles for audio files
#[derive(Parser)]
#[command(name = "wavepane")]
#[command(version)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/wavepane/wavepane.toml\n    Logs:               ~/.local/state/wavepane/wavepane.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an audio file and print its amplitude profile
    ///
    /// Prints one line per column: index, amplitude in [0, 1], and the
    /// stroke half-height in pixels for the configured panel height.
    ///
    /// Examples:
    ///   wavepane profile track.mp3
    ///   wavepane profile track.flac --width 800 --json
    #[command(visible_alias = "p")]
    Profile {
        /// Path to the audio file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of columns (defaults to panel.width from the config)
        #[arg(short, long)]
        width: Option<usize>,

        /// Print the profile as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Open the configuration file in your editor
    #[command(visible_alias = "c")]
    Config {
        /// Print the effective configuration instead of editing
        #[arg(short, long)]
        show: bool,
    },

    /// Show recent log entries
    Logs,

    /// Generate shell completion script
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If the selected command fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "wavepane", &mut io::stdout());
            return Ok(());
        }
        Commands::Logs => return commands::handle_logs(),
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        Commands::Profile { file, width, json } => {
            commands::handle_profile(file, width, json).await?;
        }
        Commands::Config { show } => {
            commands::handle_config(show)?;
        }
        Commands::Completions { .. } | Commands::Logs => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_profile() {
        let cli = Cli::try_parse_from(["wavepane", "profile", "a.mp3", "-w", "320", "--json"]).unwrap();
        match cli.command {
            Commands::Profile { file, width, json } => {
                assert_eq!(file, PathBuf::from("a.mp3"));
                assert_eq!(width, Some(320));
                assert!(json);
            }
            _ => panic!("expected profile command"),
        }
    }
}
