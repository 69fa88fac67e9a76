mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{
    orchestrator::Orchestrator, queue::JobQueue, storage::ImageStore, vision::OpenAiVisionClient,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing gymregister API server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("analysis_jobs_total", "Total analysis jobs submitted");
    metrics::describe_counter!(
        "analysis_jobs_completed",
        "Total analysis jobs that completed"
    );
    metrics::describe_counter!("analysis_jobs_failed", "Total analysis jobs that failed");
    metrics::describe_histogram!(
        "analysis_processing_seconds",
        "Time from begin to terminal state per analysis job"
    );
    metrics::describe_gauge!(
        "analysis_queue_depth",
        "Current number of jobs awaiting a worker"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize upload storage
    let store = ImageStore::new(&config.upload_dir)
        .await
        .expect("Failed to initialize image store");

    // Initialize Redis job queue
    tracing::info!("Connecting to Redis job queue");
    let queue = Arc::new(JobQueue::new(&config.redis_url).expect("Failed to initialize job queue"));

    // Initialize vision model client
    let vision = OpenAiVisionClient::new(config.openai_api_key.clone(), config.openai_model.clone());

    let orchestrator = Arc::new(Orchestrator::new(
        db_pool.clone(),
        Arc::new(store),
        queue.clone(),
        Arc::new(vision),
    ));

    // Create shared application state
    let state = AppState::new(db_pool, queue, orchestrator, config.max_upload_bytes);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/analyze", post(routes::analyze::submit_analysis))
        .route("/api/v1/analyze/{job_id}", get(routes::analyze::get_analysis))
        .route(
            "/api/v1/analysis/history",
            get(routes::analyze::analysis_history),
        )
        .route(
            "/api/v1/analysis/reprocess/{job_id}",
            post(routes::analyze::reprocess_analysis),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes + 1024 * 1024));

    tracing::info!("Starting gymregister on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
