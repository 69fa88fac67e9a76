use gymregister::{
    config::AppConfig,
    db,
    services::{
        orchestrator::Orchestrator, queue::JobQueue, storage::ImageStore,
        vision::OpenAiVisionClient,
    },
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting analysis worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Initialize services
    tracing::info!("Initializing services");
    let store = ImageStore::new(&config.upload_dir)
        .await
        .expect("Failed to initialize image store");

    let queue = Arc::new(JobQueue::new(&config.redis_url).expect("Failed to initialize job queue"));

    let vision = OpenAiVisionClient::new(config.openai_api_key.clone(), config.openai_model.clone());

    let orchestrator = Orchestrator::new(
        db_pool,
        Arc::new(store),
        queue.clone(),
        Arc::new(vision),
    );

    tracing::info!("Worker ready, starting job processing loop");

    // Main processing loop. Each queue entry gets exactly one
    // execution attempt; failed jobs are not re-queued.
    loop {
        match process_next_job(&queue, &orchestrator).await {
            Ok(true) => {
                tracing::debug!("Job processed, checking for next job");
            }
            Ok(false) => {
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Queue error, backing off");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}

/// Process the next job from the queue.
/// Returns Ok(true) if a job was consumed, Ok(false) if none available.
async fn process_next_job(
    queue: &JobQueue,
    orchestrator: &Orchestrator,
) -> Result<bool, gymregister::services::queue::QueueError> {
    let entry = match queue.dequeue().await? {
        Some(j) => j,
        None => return Ok(false),
    };

    tracing::info!(job_id = %entry.job_id, "Processing analysis job");

    match orchestrator.begin(entry.job_id).await {
        Ok(job) => {
            tracing::info!(
                job_id = %job.id,
                status = %job.status,
                confidence = job.confidence_score.unwrap_or(0.0),
                "Job execution finished"
            );
        }
        Err(e) => {
            // Precondition violations and store failures land here;
            // the entry is acked either way so it cannot loop.
            tracing::error!(job_id = %entry.job_id, error = %e, "Job execution error");
        }
    }

    queue.ack(&entry).await?;

    if let Ok(depth) = queue.depth().await {
        metrics::gauge!("analysis_queue_depth").set(depth as f64);
    }

    Ok(true)
}
