//! ffmpeg-backed [`PcmDecoder`].
//!
//! The source file is copied into a job-owned temporary file, transcoded to
//! 44.1 kHz stereo 16-bit little-endian WAV, and read back with `hound`.
//! ffmpeg runs as a child process so that cancellation can kill it outright.

use super::amplitude::{read_wav_amplitudes, RawSampleBuffer};
use super::error::{DecodeError, Result};
use super::progress::{split_status_lines, ProgressParser};
use super::session::DecodeSession;
use super::PcmDecoder;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// PCM layout every source is transcoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub codec: &'static str,
}

impl TargetFormat {
    /// 44.1 kHz, 16-bit signed little-endian, stereo.
    pub const CD_STEREO: TargetFormat = TargetFormat {
        sample_rate: 44100,
        channels: 2,
        codec: "pcm_s16le",
    };
}

/// How often the transcode loop wakes to check for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Number of stderr lines kept for error reporting.
const STDERR_TAIL: usize = 8;

/// Locates the ffmpeg binary on the system.
///
/// Checks in this order:
/// 1. An explicitly configured path
/// 2. Standard install locations for the current platform
/// 3. A PATH search via `which` or `where`
///
/// # Errors
/// - If a configured path does not exist
/// - If ffmpeg cannot be found anywhere
pub fn find_ffmpeg(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(DecodeError::TranscoderMissing(format!(
            "Configured ffmpeg not found at {}",
            path.display()
        )));
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &["/opt/homebrew/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/usr/bin/ffmpeg"]
    } else if cfg!(target_os = "linux") {
        &["/usr/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/snap/bin/ffmpeg"]
    } else if cfg!(target_os = "windows") {
        &[
            "C:\\ffmpeg\\bin\\ffmpeg.exe",
            "C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe",
        ]
    } else {
        &[]
    };

    if let Some(found) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        tracing::debug!("Found ffmpeg at: {}", found.display());
        return Ok(found);
    }

    let found = find_in_path("ffmpeg")?;
    tracing::debug!("Found ffmpeg in PATH at: {}", found.display());
    Ok(found)
}

fn find_in_path(binary_name: &str) -> Result<PathBuf> {
    let search_cmd = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    let not_found = || {
        DecodeError::TranscoderMissing(
            "ffmpeg not found. Please install ffmpeg:\n\
             macOS: brew install ffmpeg\n\
             Linux: apt install ffmpeg (Debian/Ubuntu) or dnf install ffmpeg (Fedora)\n\
             Windows: Download from https://ffmpeg.org/download.html"
                .to_string(),
        )
    };

    let output = Command::new(search_cmd)
        .arg(binary_name)
        .output()
        .map_err(|_| not_found())?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        // `where` may list several matches
        if let Some(first) = path_str.lines().map(str::trim).find(|l| !l.is_empty()) {
            return Ok(PathBuf::from(first));
        }
    }

    Err(not_found())
}

/// Decoder that shells out to ffmpeg.
pub struct FfmpegDecoder {
    ffmpeg: PathBuf,
    format: TargetFormat,
}

impl FfmpegDecoder {
    /// Creates a decoder using a known ffmpeg binary.
    pub fn new(ffmpeg: PathBuf) -> Self {
        Self {
            ffmpeg,
            format: TargetFormat::CD_STEREO,
        }
    }

    /// Creates a decoder after locating ffmpeg.
    ///
    /// # Errors
    /// - If no ffmpeg binary can be found
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        Ok(Self::new(find_ffmpeg(configured)?))
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    fn transcode_command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner")
            .arg("-nostdin")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg("-acodec")
            .arg(self.format.codec)
            .arg("-ar")
            .arg(self.format.sample_rate.to_string())
            .arg("-ac")
            .arg(self.format.channels.to_string())
            .arg("-f")
            .arg("wav")
            .arg("-y")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }

    /// Runs ffmpeg to completion, forwarding progress and honoring cancellation.
    fn transcode(&self, input: &Path, output: &Path, session: &DecodeSession<'_>) -> Result<()> {
        let mut child = self.transcode_command(input, output).spawn()?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DecodeError::Io(std::io::Error::other("ffmpeg stderr not captured")))?;

        let (line_tx, line_rx) = mpsc::channel::<String>();
        let spawned = thread::Builder::new()
            .name("ffmpeg-stderr".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(stderr);
                let mut chunk = Vec::new();
                loop {
                    chunk.clear();
                    match reader.read_until(b'\r', &mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            for line in split_status_lines(&chunk) {
                                if line_tx.send(line).is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
            });
        let reader = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                kill(&mut child);
                return Err(e.into());
            }
        };

        let mut parser = match ProgressParser::new() {
            Ok(parser) => Some(parser),
            Err(e) => {
                tracing::warn!("Progress reporting disabled: {}", e);
                None
            }
        };
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);

        let status = loop {
            if session.is_cancelled() {
                kill(&mut child);
                // Grandchildren may still hold stderr open; the reader exits on
                // EOF or once the receiver is gone, so it is left detached.
                drop(reader);
                return Err(DecodeError::Cancelled);
            }

            match line_rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => {
                    if let Some(percent) = parser.as_mut().and_then(|p| p.feed(&line)) {
                        session.report_progress(percent);
                    } else if !line.starts_with("size=") {
                        if tail.len() == STDERR_TAIL {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
                Err(RecvTimeoutError::Timeout) => match child.try_wait() {
                    Ok(Some(status)) => break status,
                    Ok(None) => {}
                    Err(e) => {
                        kill(&mut child);
                        return Err(e.into());
                    }
                },
                // stderr closed; the process is exiting
                Err(RecvTimeoutError::Disconnected) => match child.wait() {
                    Ok(status) => break status,
                    Err(e) => {
                        kill(&mut child);
                        return Err(e.into());
                    }
                },
            }
        };

        let _ = reader.join();
        // Drain lines that raced the exit.
        for line in line_rx.try_iter() {
            if tail.len() == STDERR_TAIL {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        if status.success() {
            session.report_progress(100.0);
            tracing::debug!("ffmpeg transcode finished: {}", output.display());
            return Ok(());
        }

        let message = tail.into_iter().collect::<Vec<_>>().join("\n");
        tracing::error!("ffmpeg transcode failed: {}", message);
        Err(classify_failure(status.code(), message))
    }
}

impl PcmDecoder for FfmpegDecoder {
    fn decode(&self, path: &Path, session: &mut DecodeSession<'_>) -> Result<RawSampleBuffer> {
        if !path.exists() {
            return Err(DecodeError::SourceMissing(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let copied = session.temp_file("original_", &extension)?;
        let decoded = session.temp_file("decoded_", ".wav")?;

        std::fs::copy(path, &copied)?;
        tracing::debug!("Copied {} to {}", path.display(), copied.display());
        session.checkpoint()?;

        self.transcode(&copied, &decoded, session)?;
        session.checkpoint()?;

        read_wav_amplitudes(&decoded, session)
    }
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!("ffmpeg already exited: {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!("Failed to reap ffmpeg: {}", e);
    }
    tracing::debug!("ffmpeg stopped");
}

/// Maps a failed ffmpeg run onto the decode error taxonomy.
fn classify_failure(code: Option<i32>, message: String) -> DecodeError {
    const UNSUPPORTED_MARKERS: [&str; 4] = [
        "Invalid data found when processing input",
        "does not contain any stream",
        "Unknown format",
        "could not find codec parameters",
    ];

    let lowered = message.to_lowercase();
    if UNSUPPORTED_MARKERS
        .iter()
        .any(|marker| lowered.contains(&marker.to_lowercase()))
    {
        DecodeError::UnsupportedFormat(message)
    } else {
        DecodeError::Transcoder { code, message }
    }
}
