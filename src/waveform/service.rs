//! Single-flight background job runner for waveform extraction.
//!
//! A [`WaveformService`] owns the published [`AmplitudeProfile`] and a
//! size-one cache of decoded samples. Each submitted job runs decode and
//! bucketize on Tokio's blocking pool. Submitting a new job cancels the
//! previous one and stops the painter first; a pipeline lock keeps two jobs
//! from ever executing at the same time, even while a superseded job is still
//! unwinding.
//!
//! Every job ends in exactly one of `Succeeded`, `Failed` or `Cancelled`,
//! removes its temporary files before that state is published, and only a
//! successful, still-current job replaces the profile.

use super::bucketize::{bucketize_until, AmplitudeProfile};
use super::error::JobError;
use super::job::{JobHandle, JobId, JobKind, JobOutcome, JobRequest, JobState, JobStatus};
use super::surface::{PanelFrame, WaveformSurface};
use crate::decoding::{
    CancelFlag, DecodeSession, LogProgress, PcmDecoder, ProgressSink, RawSampleBuffer,
    TempArtifacts,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::watch;

/// Optional knobs for a [`WaveformService`].
pub struct ServiceOptions {
    /// Directory for temporary artifacts
    pub temp_dir: PathBuf,
    /// Receiver of decode progress
    pub progress: Arc<dyn ProgressSink>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            progress: Arc::new(LogProgress),
        }
    }
}

/// Decoded samples kept for the most recently decoded file.
struct CachedSamples {
    path: PathBuf,
    samples: Arc<RawSampleBuffer>,
}

struct ActiveJob {
    id: JobId,
    cancel: CancelFlag,
}

/// Everything a finished pipeline hands back for publication.
struct Computed {
    samples: Arc<RawSampleBuffer>,
    profile: AmplitudeProfile,
    decoded: bool,
}

struct Inner {
    decoder: Arc<dyn PcmDecoder>,
    surface: Arc<dyn WaveformSurface>,
    progress: Arc<dyn ProgressSink>,
    temp_dir: PathBuf,
    width: usize,
    profile: RwLock<Arc<AmplitudeProfile>>,
    cache: Mutex<Option<CachedSamples>>,
    active: Mutex<Option<ActiveJob>>,
    pipeline: Mutex<()>,
    status: watch::Sender<JobStatus>,
    next_id: AtomicU64,
    cursor: AtomicUsize,
}

/// Cancellable, single-flight decode and bucketize runner for one panel.
#[derive(Clone)]
pub struct WaveformService {
    inner: Arc<Inner>,
}

impl WaveformService {
    /// Creates a service producing profiles `width` columns wide.
    pub fn new(
        decoder: Arc<dyn PcmDecoder>,
        surface: Arc<dyn WaveformSurface>,
        width: usize,
    ) -> Self {
        Self::with_options(decoder, surface, width, ServiceOptions::default())
    }

    pub fn with_options(
        decoder: Arc<dyn PcmDecoder>,
        surface: Arc<dyn WaveformSurface>,
        width: usize,
        options: ServiceOptions,
    ) -> Self {
        let (status, _) = watch::channel(JobStatus::IDLE);
        Self {
            inner: Arc::new(Inner {
                decoder,
                surface,
                progress: options.progress,
                temp_dir: options.temp_dir,
                width,
                profile: RwLock::new(Arc::new(AmplitudeProfile::idle(width))),
                cache: Mutex::new(None),
                active: Mutex::new(None),
                pipeline: Mutex::new(()),
                status,
                next_id: AtomicU64::new(0),
                cursor: AtomicUsize::new(0),
            }),
        }
    }

    /// Starts a job, cancelling whatever job is currently active.
    ///
    /// The painter is stopped before the new job is registered. Must be called
    /// from within a Tokio runtime.
    pub fn submit(&self, request: JobRequest) -> JobHandle {
        let inner = &self.inner;
        let id = JobId(inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let cancel = CancelFlag::new();

        {
            let mut active = lock(&inner.active);
            if let Some(previous) = active.take() {
                tracing::info!("{} superseded by {}", previous.id, id);
                previous.cancel.cancel();
            }
            inner.surface.stop_painter();
            *active = Some(ActiveJob {
                id,
                cancel: cancel.clone(),
            });
            inner.publish(Some(id), JobState::Running);
        }

        tracing::info!(
            "Submitted {} for {} ({:?})",
            id,
            request.path.display(),
            request.kind
        );

        let worker = Arc::clone(inner);
        let task = tokio::task::spawn_blocking(move || worker.run_job(id, request, cancel));
        JobHandle::new(id, task)
    }

    /// Cancels the active job, if any, and stops the painter.
    pub fn stop(&self) {
        let active = lock(&self.inner.active);
        if let Some(job) = active.as_ref() {
            tracing::info!("Stopping {}", job.id);
            job.cancel.cancel();
        }
        self.inner.surface.stop_painter();
    }

    /// Current profile snapshot.
    pub fn profile(&self) -> Arc<AmplitudeProfile> {
        Arc::clone(&read(&self.inner.profile))
    }

    /// Resets the published profile to the idle line.
    pub fn clear(&self) {
        *write(&self.inner.profile) = Arc::new(AmplitudeProfile::idle(self.inner.width));
        tracing::debug!("Profile cleared");
    }

    /// Moves the playback cursor, clamped to the panel width.
    pub fn set_cursor(&self, column: usize) {
        self.inner
            .cursor
            .store(column.min(self.inner.width), Ordering::SeqCst);
    }

    pub fn cursor(&self) -> usize {
        self.inner.cursor.load(Ordering::SeqCst)
    }

    /// Profile and cursor for one paint pass.
    pub fn frame(&self) -> PanelFrame {
        PanelFrame {
            profile: self.profile(),
            cursor: self.cursor(),
        }
    }

    pub fn width(&self) -> usize {
        self.inner.width
    }

    pub fn status(&self) -> JobStatus {
        *self.inner.status.borrow()
    }

    pub fn state(&self) -> JobState {
        self.status().state
    }

    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.inner.status.subscribe()
    }

    /// File whose decoded samples are cached, if any.
    pub fn cached_path(&self) -> Option<PathBuf> {
        lock(&self.inner.cache).as_ref().map(|c| c.path.clone())
    }
}

impl Inner {
    fn publish(&self, job: Option<JobId>, state: JobState) {
        let finished = self.status.borrow().finished;
        self.status.send_replace(JobStatus {
            job,
            state,
            finished,
        });
    }

    fn run_job(&self, id: JobId, request: JobRequest, cancel: CancelFlag) -> JobOutcome {
        let _serial = lock(&self.pipeline);
        let span = tracing::info_span!("waveform_job", job = %id, path = %request.path.display());
        let _entered = span.enter();

        let mut artifacts = TempArtifacts::new(&self.temp_dir, id.to_string());
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(&request, &cancel, &mut artifacts)
        }))
        .unwrap_or_else(|payload| Err(JobError::WorkerPanicked(panic_message(&*payload))));
        artifacts.cleanup();

        self.finish(id, &request, &cancel, result)
    }

    fn execute(
        &self,
        request: &JobRequest,
        cancel: &CancelFlag,
        artifacts: &mut TempArtifacts,
    ) -> Result<Computed, JobError> {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let cached = match request.kind {
            JobKind::BucketizeOnly => self.cached_samples(&request.path),
            JobKind::DecodeAndBucketize => None,
        };

        let (samples, decoded) = match cached {
            Some(samples) => {
                tracing::debug!("Reusing {} cached samples", samples.len());
                (samples, false)
            }
            None => {
                let mut session = DecodeSession::new(artifacts, cancel, self.progress.as_ref());
                let samples = self.decoder.decode(&request.path, &mut session)?;
                tracing::debug!("Decoded {} samples", samples.len());
                (Arc::new(samples), true)
            }
        };

        let profile = bucketize_until(samples.as_slice(), self.width, || !cancel.is_cancelled())
            .ok_or(JobError::Cancelled)?;

        Ok(Computed {
            samples,
            profile,
            decoded,
        })
    }

    fn cached_samples(&self, path: &Path) -> Option<Arc<RawSampleBuffer>> {
        lock(&self.cache)
            .as_ref()
            .filter(|cached| cached.path == path)
            .map(|cached| Arc::clone(&cached.samples))
    }

    /// Publishes the outcome if the job is still current and returns it.
    fn finish(
        &self,
        id: JobId,
        request: &JobRequest,
        cancel: &CancelFlag,
        result: Result<Computed, JobError>,
    ) -> JobOutcome {
        let mut active = lock(&self.active);
        let current = active.as_ref().is_some_and(|job| job.id == id);

        let outcome = match result {
            Ok(_) if cancel.is_cancelled() || !current => Err(JobError::Cancelled),
            Ok(computed) => {
                let profile = Arc::new(computed.profile);
                *write(&self.profile) = Arc::clone(&profile);
                if computed.decoded {
                    *lock(&self.cache) = Some(CachedSamples {
                        path: request.path.clone(),
                        samples: computed.samples,
                    });
                }
                self.surface.start_painter();
                Ok(profile)
            }
            Err(e) => Err(e),
        };

        let terminal = match &outcome {
            Ok(_) => {
                tracing::info!("Waveform ready for {}", request.path.display());
                JobState::Succeeded
            }
            Err(JobError::Cancelled) => {
                tracing::info!("Waveform job cancelled");
                JobState::Cancelled
            }
            Err(e) => {
                tracing::error!("Waveform job failed: {}", e);
                // Keep showing the last good profile.
                if current {
                    self.surface.start_painter();
                }
                JobState::Failed
            }
        };

        if current {
            self.publish(Some(id), terminal);
            *active = None;
            self.status.send_replace(JobStatus {
                job: None,
                state: JobState::Idle,
                finished: Some((id, terminal)),
            });
        }

        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
