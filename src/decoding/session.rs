//! Per-job decode context.
//!
//! A [`DecodeSession`] carries everything a decoder may touch for one job:
//! the cancellation flag, the progress sink and the set of temporary files
//! that must disappear when the job ends. Nothing here is shared between jobs.

use super::error::{DecodeError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempPath;

/// Receives decode progress as a percentage in `0.0..=100.0`.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, percent: f32);
}

impl<F> ProgressSink for F
where
    F: Fn(f32) + Send + Sync,
{
    fn progress(&self, percent: f32) {
        self(percent)
    }
}

/// Progress sink that writes to the debug log.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&self, percent: f32) {
        tracing::debug!("Decode progress: {:.1}%", percent);
    }
}

/// Cooperative cancellation flag shared between a job and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Temporary files created on behalf of one job.
///
/// Files are removed by [`TempArtifacts::cleanup`]; anything still held when
/// the value is dropped is removed by `tempfile`'s own drop.
pub struct TempArtifacts {
    dir: PathBuf,
    tag: String,
    paths: Vec<TempPath>,
}

impl TempArtifacts {
    /// Creates an empty artifact set rooted at `dir`, tagging names with `tag`.
    pub fn new(dir: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            tag: tag.into(),
            paths: Vec::new(),
        }
    }

    /// Creates an empty file named `<prefix><tag>_<random><suffix>`.
    pub fn create(&mut self, prefix: &str, suffix: &str) -> Result<PathBuf> {
        let temp = tempfile::Builder::new()
            .prefix(&format!("{prefix}{}_", self.tag))
            .suffix(suffix)
            .tempfile_in(&self.dir)?;
        let path = temp.into_temp_path();
        let owned = path.to_path_buf();
        tracing::debug!("Temporary artifact created: {}", owned.display());
        self.paths.push(path);
        Ok(owned)
    }

    /// Paths currently held.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.iter().map(|p| p.to_path_buf()).collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Removes every artifact. Failures are logged and never returned.
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            let shown = path.to_path_buf();
            match path.close() {
                Ok(()) => tracing::debug!("Temporary artifact removed: {}", shown.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    "Failed to remove temporary artifact {}: {}",
                    shown.display(),
                    e
                ),
            }
        }
    }
}

/// Context handed to a [`super::PcmDecoder`] for a single job.
pub struct DecodeSession<'a> {
    artifacts: &'a mut TempArtifacts,
    cancel: &'a CancelFlag,
    progress: &'a dyn ProgressSink,
}

impl<'a> DecodeSession<'a> {
    pub fn new(
        artifacts: &'a mut TempArtifacts,
        cancel: &'a CancelFlag,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            artifacts,
            cancel,
            progress,
        }
    }

    /// Creates a temporary file owned by the job.
    pub fn temp_file(&mut self, prefix: &str, suffix: &str) -> Result<PathBuf> {
        self.artifacts.create(prefix, suffix)
    }

    /// Directory temporary files are placed in.
    pub fn temp_dir(&self) -> &Path {
        &self.artifacts.dir
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns [`DecodeError::Cancelled`] once the job has been cancelled.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(DecodeError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn report_progress(&self, percent: f32) {
        self.progress.progress(percent.clamp(0.0, 100.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_artifacts_are_tagged_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut artifacts = TempArtifacts::new(dir.path(), "job7");

        let copy = artifacts.create("original_", ".mp3").unwrap();
        let decoded = artifacts.create("decoded_", ".wav").unwrap();
        assert_ne!(copy, decoded);
        assert!(copy.exists() && decoded.exists());

        let name = decoded.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("decoded_job7_"));
        assert!(name.ends_with(".wav"));

        artifacts.cleanup();
        assert!(artifacts.is_empty());
        assert!(!copy.exists());
        assert!(!decoded.exists());
    }

    #[test]
    fn test_cleanup_tolerates_already_removed_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut artifacts = TempArtifacts::new(dir.path(), "job1");
        let path = artifacts.create("decoded_", ".wav").unwrap();
        std::fs::remove_file(&path).unwrap();
        artifacts.cleanup();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_drop_removes_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let mut artifacts = TempArtifacts::new(dir.path(), "job2");
            artifacts.create("original_", ".flac").unwrap()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_session_checkpoint_and_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut artifacts = TempArtifacts::new(dir.path(), "job3");
        let cancel = CancelFlag::new();
        let seen = Mutex::new(Vec::new());
        let sink = |p: f32| seen.lock().unwrap().push(p);

        let session = DecodeSession::new(&mut artifacts, &cancel, &sink);
        assert!(session.checkpoint().is_ok());
        session.report_progress(42.0);
        session.report_progress(180.0);

        cancel.cancel();
        assert!(matches!(session.checkpoint(), Err(DecodeError::Cancelled)));
        assert_eq!(*seen.lock().unwrap(), vec![42.0, 100.0]);
    }
}
