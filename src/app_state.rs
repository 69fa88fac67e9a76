use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{orchestrator::Orchestrator, queue::JobQueue};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: Arc<JobQueue>,
    pub orchestrator: Arc<Orchestrator>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        db: PgPool,
        queue: Arc<JobQueue>,
        orchestrator: Arc<Orchestrator>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            db,
            queue,
            orchestrator,
            max_upload_bytes,
        }
    }
}
