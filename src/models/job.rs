use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle state of an analysis job.
///
/// `Completed` and `Failed` are terminal: nothing transitions out of
/// them except an explicit reprocess, which resets to `Pending`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One unit of asynchronous image-analysis work.
///
/// Invariants enforced by the store's write paths: `result` is set iff
/// `status == Completed`, `error_message` is set iff `status == Failed`,
/// and `completed_at`/`processing_time` are stamped exactly once at the
/// transition into a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: Uuid,
    /// Canonical (upper-cased) asset tag, if one was supplied at submission.
    pub asset_tag: Option<String>,
    pub image_path: String,
    pub original_filename: Option<String>,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub confidence_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock processing duration in fractional seconds.
    pub processing_time: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_snake_case() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let text = status.to_string();
            assert_eq!(text, text.to_lowercase());
            assert_eq!(text.parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
