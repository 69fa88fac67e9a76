use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries;
use crate::models::job::{AnalysisJob, JobStatus};
use crate::services::queue::{JobQueue, QueueError, QueuedJob};
use crate::services::reconciler;
use crate::services::scoring;
use crate::services::storage::{ImageStore, StorageError};
use crate::services::vision::VisionAnalyzer;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("analysis job {0} not found")]
    NotFound(Uuid),

    #[error("analysis job {job_id} is {status}, expected {expected}")]
    InvalidState {
        job_id: Uuid,
        status: JobStatus,
        expected: &'static str,
    },

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("job queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("image storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Drives the analysis-job state machine.
///
/// `create` and `reprocess` run on the request path and only persist
/// and enqueue; `begin` runs on the worker and owns the
/// pending → processing → completed|failed transitions.
pub struct Orchestrator {
    db: PgPool,
    store: Arc<ImageStore>,
    queue: Arc<JobQueue>,
    vision: Arc<dyn VisionAnalyzer>,
}

impl Orchestrator {
    pub fn new(
        db: PgPool,
        store: Arc<ImageStore>,
        queue: Arc<JobQueue>,
        vision: Arc<dyn VisionAnalyzer>,
    ) -> Self {
        Self {
            db,
            store,
            queue,
            vision,
        }
    }

    /// Persist an uploaded image, insert a pending job, and enqueue it
    /// for background execution. Returns immediately; the caller polls
    /// for completion.
    pub async fn create(
        &self,
        image_bytes: &[u8],
        original_filename: Option<&str>,
        asset_tag: Option<&str>,
    ) -> Result<AnalysisJob, OrchestratorError> {
        let job_id = Uuid::new_v4();
        let path = self.store.save(job_id, original_filename, image_bytes).await?;

        let canonical_tag = asset_tag.map(str::to_uppercase);
        let job = queries::create_job(
            &self.db,
            job_id,
            canonical_tag.as_deref(),
            &path.to_string_lossy(),
            original_filename,
        )
        .await?;

        self.queue.enqueue(&QueuedJob { job_id }).await?;

        metrics::counter!("analysis_jobs_total").increment(1);
        tracing::info!(
            job_id = %job.id,
            asset_tag = canonical_tag.as_deref().unwrap_or("-"),
            filename = original_filename.unwrap_or("-"),
            "Analysis job created"
        );

        Ok(job)
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Option<AnalysisJob>, OrchestratorError> {
        Ok(queries::get_job(&self.db, job_id).await?)
    }

    pub async fn list(
        &self,
        status: Option<JobStatus>,
        asset_tag: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<AnalysisJob>, i64), OrchestratorError> {
        let canonical_tag = asset_tag.map(str::to_uppercase);
        Ok(queries::list_jobs(&self.db, status, canonical_tag.as_deref(), skip, limit).await?)
    }

    /// Execute a pending job end to end: normalize, call the vision
    /// model, score, write the terminal state, and reconcile.
    ///
    /// Scheduling guarantees each job is picked up at most once, so a
    /// non-pending job here is a precondition violation, surfaced as
    /// an error rather than skipped.
    pub async fn begin(&self, job_id: Uuid) -> Result<AnalysisJob, OrchestratorError> {
        let start = Instant::now();

        let job = queries::get_job(&self.db, job_id)
            .await?
            .ok_or(OrchestratorError::NotFound(job_id))?;

        if job.status != JobStatus::Pending {
            return Err(OrchestratorError::InvalidState {
                job_id,
                status: job.status,
                expected: "pending",
            });
        }

        queries::mark_processing(&self.db, job_id).await?;

        let outcome = self
            .vision
            .analyze(Path::new(&job.image_path), job.asset_tag.as_deref())
            .await;
        let elapsed = start.elapsed().as_secs_f64();

        match outcome {
            Ok(result) => {
                let confidence = scoring::score(&result);
                // AnalysisResult is plain data; encoding it cannot
                // realistically fail, but a failure is still a failed job.
                match serde_json::to_value(&result) {
                    Ok(value) => {
                        if let Err(e) =
                            queries::complete_job(&self.db, job_id, &value, confidence, elapsed)
                                .await
                        {
                            self.try_mark_failed(
                                job_id,
                                &format!("failed to store analysis result: {e}"),
                                elapsed,
                            )
                            .await;
                            return Err(e.into());
                        }

                        metrics::counter!("analysis_jobs_completed").increment(1);
                        metrics::histogram!("analysis_processing_seconds").record(elapsed);
                        tracing::info!(
                            job_id = %job_id,
                            confidence,
                            processing_seconds = elapsed,
                            "Analysis job completed"
                        );
                    }
                    Err(e) => {
                        queries::fail_job(
                            &self.db,
                            job_id,
                            &format!("failed to encode analysis result: {e}"),
                            elapsed,
                        )
                        .await?;
                        metrics::counter!("analysis_jobs_failed").increment(1);
                    }
                }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(job_id = %job_id, error = %message, "Analysis job failed");

                // If even the failure write is rejected the job stays
                // in `processing`; the worker surfaces the error.
                queries::fail_job(&self.db, job_id, &message, elapsed).await?;
                metrics::counter!("analysis_jobs_failed").increment(1);
                metrics::histogram!("analysis_processing_seconds").record(elapsed);
            }
        }

        let job = queries::get_job(&self.db, job_id)
            .await?
            .ok_or(OrchestratorError::NotFound(job_id))?;

        if job.status == JobStatus::Completed && job.asset_tag.is_some() {
            reconciler::reconcile(&self.db, &job).await;
        }

        Ok(job)
    }

    /// Reset a terminal job to pending and re-enqueue it. Jobs still
    /// pending or processing are rejected: cancellation of an in-flight
    /// execution is not supported.
    pub async fn reprocess(&self, job_id: Uuid) -> Result<AnalysisJob, OrchestratorError> {
        let job = queries::get_job(&self.db, job_id)
            .await?
            .ok_or(OrchestratorError::NotFound(job_id))?;

        if !job.status.is_terminal() {
            return Err(OrchestratorError::InvalidState {
                job_id,
                status: job.status,
                expected: "completed or failed",
            });
        }

        queries::reset_job(&self.db, job_id).await?;
        self.queue.enqueue(&QueuedJob { job_id }).await?;

        tracing::info!(job_id = %job_id, "Analysis job reset for reprocessing");

        let job = queries::get_job(&self.db, job_id)
            .await?
            .ok_or(OrchestratorError::NotFound(job_id))?;
        Ok(job)
    }

    async fn try_mark_failed(&self, job_id: Uuid, message: &str, elapsed: f64) {
        if let Err(e) = queries::fail_job(&self.db, job_id, message, elapsed).await {
            tracing::error!(
                job_id = %job_id,
                error = %e,
                "Could not record job failure; job left in processing state"
            );
        } else {
            metrics::counter!("analysis_jobs_failed").increment(1);
        }
    }
}
