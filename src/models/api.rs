use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{AnalysisJob, JobStatus};

/// Response after submitting an image for analysis (or a reprocess request).
#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

/// Query parameters for the analysis history listing.
#[derive(Debug, Deserialize, Validate)]
pub struct HistoryQuery {
    #[serde(default)]
    #[garde(range(min = 0))]
    pub skip: i64,

    #[serde(default = "default_limit")]
    #[garde(range(min = 1, max = 100))]
    pub limit: i64,

    #[garde(skip)]
    pub status: Option<JobStatus>,

    #[garde(inner(length(min = 1, max = 100)))]
    pub asset_tag: Option<String>,
}

fn default_limit() -> i64 {
    50
}

/// Paginated listing of analysis jobs.
#[derive(Debug, Serialize)]
pub struct HistoryPage {
    pub items: Vec<AnalysisJob>,
    pub total: i64,
}
