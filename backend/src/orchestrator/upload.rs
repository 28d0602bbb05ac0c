//! Upload → analyze → cleanup
//!
//! File-based analysis tasks upload their input, run one generation call
//! against the uploaded reference, and then delete the remote copy. The
//! delete runs detached and its failure is only logged. It is scheduled
//! even when the task future is dropped while the analysis is in flight.

use crate::orchestrator::error::TaskError;
use crate::orchestrator::task::{InputFile, TaskLifecycle, TaskState};
use crate::provider::{ProviderClient, UploadedFileHandle};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;
use tracing::Instrument;

/// Registry of detached cleanup jobs
///
/// Jobs are never awaited by the task that spawned them. `drain` lets the
/// server (on shutdown) and tests wait for whatever is still running.
#[derive(Clone, Default)]
pub struct CleanupTracker {
    jobs: Arc<Mutex<JoinSet<()>>>,
}

impl std::fmt::Debug for CleanupTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupTracker")
            .field("pending", &self.pending())
            .finish()
    }
}

impl CleanupTracker {
    /// Empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a cleanup job, reaping any that already finished
    ///
    /// Outside a tokio runtime the job is dropped with a warning.
    pub fn spawn<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime available, cleanup job skipped");
            return;
        };
        let mut jobs = self.jobs();
        while let Some(finished) = jobs.try_join_next() {
            if let Err(e) = finished {
                tracing::warn!(error = %e, "Cleanup job aborted");
            }
        }
        jobs.spawn_on(job, &runtime);
    }

    /// Jobs spawned and not yet reaped
    pub fn pending(&self) -> usize {
        self.jobs().len()
    }

    /// Wait for every outstanding job
    pub async fn drain(&self) {
        let mut jobs = std::mem::take(&mut *self.jobs());
        let count = jobs.len();
        while let Some(finished) = jobs.join_next().await {
            if let Err(e) = finished {
                tracing::warn!(error = %e, "Cleanup job aborted");
            }
        }
        if count > 0 {
            tracing::debug!(count, "Drained cleanup jobs");
        }
    }
}

/// Sequences upload, analysis, and best-effort deletion for one task
pub struct UploadCleanupPipeline {
    client: Arc<dyn ProviderClient>,
    cleanups: CleanupTracker,
}

impl UploadCleanupPipeline {
    /// Pipeline over `client`, registering deletes with `cleanups`
    pub fn new(client: Arc<dyn ProviderClient>, cleanups: CleanupTracker) -> Self {
        Self { client, cleanups }
    }

    /// Upload `file`, hand the remote handle to `analyze`, then delete it
    ///
    /// The lifecycle moves to `Uploading` before the upload and to
    /// `Processing` once it returns.
    ///
    /// # Errors
    /// * `TaskError::Upload` if the upload fails. Nothing is deleted.
    /// * Whatever `analyze` returns. The delete is still scheduled and its
    ///   outcome never replaces this error.
    ///
    /// Once the upload has returned, dropping the returned future still
    /// schedules the delete.
    pub async fn run_with_cleanup<F, Fut, T>(
        &self,
        file: &InputFile,
        lifecycle: &mut TaskLifecycle,
        analyze: F,
    ) -> Result<T, TaskError>
    where
        F: FnOnce(UploadedFileHandle) -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        lifecycle.advance(TaskState::Uploading);
        let handle = self
            .client
            .upload_file(&file.bytes, &file.mime_type, &file.display_name)
            .await
            .map_err(TaskError::Upload)?;
        tracing::debug!(
            remote_name = %handle.remote_name,
            bytes = file.bytes.len(),
            "File uploaded"
        );

        lifecycle.advance(TaskState::Processing);
        let _delete = DeleteOnDrop {
            pipeline: self,
            remote_name: handle.remote_name.clone(),
        };
        analyze(handle).await
    }

    fn schedule_delete(&self, remote_name: String) {
        let client = self.client.clone();
        let span = tracing::info_span!("file_cleanup", remote_name = %remote_name);
        self.cleanups.spawn(
            async move {
                match client.delete_file(&remote_name).await {
                    Ok(()) => tracing::debug!("Deleted uploaded file"),
                    Err(e) => tracing::warn!(error = %e, "Failed to delete uploaded file"),
                }
            }
            .instrument(span),
        );
    }
}

/// Schedules the delete of one uploaded file when it goes out of scope
struct DeleteOnDrop<'a> {
    pipeline: &'a UploadCleanupPipeline,
    remote_name: String,
}

impl Drop for DeleteOnDrop<'_> {
    fn drop(&mut self) {
        let remote_name = std::mem::take(&mut self.remote_name);
        self.pipeline.schedule_delete(remote_name);
    }
}
