use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{HistoryPage, HistoryQuery, JobSummary};
use crate::models::job::AnalysisJob;
use crate::services::audit::{self, AuditEvent};
use crate::services::orchestrator::OrchestratorError;

fn error_status(e: &OrchestratorError) -> StatusCode {
    match e {
        OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
        OrchestratorError::InvalidState { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /api/v1/analyze — upload an image for AI analysis.
///
/// Returns 202 with the job id immediately; analysis happens on the
/// background worker and is polled via the job endpoint.
pub async fn submit_analysis(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<JobSummary>), (StatusCode, String)> {
    let mut image_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut asset_tag: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                filename = field.file_name().map(str::to_string);
                content_type = field.content_type().map(str::to_string);

                if !content_type
                    .as_deref()
                    .is_some_and(|ct| ct.starts_with("image/"))
                {
                    return Err((StatusCode::BAD_REQUEST, "file must be an image".to_string()));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("failed to read upload: {e}")))?;

                if data.len() > state.max_upload_bytes {
                    return Err((
                        StatusCode::BAD_REQUEST,
                        format!(
                            "file too large, maximum size is {:.1}MB",
                            state.max_upload_bytes as f64 / 1024.0 / 1024.0
                        ),
                    ));
                }

                // Reject payloads that only claim to be images.
                image::guess_format(&data)
                    .map_err(|_| (StatusCode::BAD_REQUEST, "file must be an image".to_string()))?;

                image_data = Some(data.to_vec());
            }
            Some("asset_tag") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid asset_tag: {e}")))?;
                if !value.trim().is_empty() {
                    asset_tag = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let image_data = image_data.ok_or((
        StatusCode::BAD_REQUEST,
        "missing required field: file".to_string(),
    ))?;

    let job = state
        .orchestrator
        .create(&image_data, filename.as_deref(), asset_tag.as_deref())
        .await
        .map_err(|e| (error_status(&e), e.to_string()))?;

    audit::log_action(
        &state.db,
        AuditEvent {
            action: "ANALYZE_REQUEST",
            resource_type: "analysis",
            resource_id: job.id,
            payload: Some(serde_json::json!({
                "filename": filename,
                "asset_tag": asset_tag,
                "content_type": content_type,
            })),
        },
    )
    .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobSummary {
            job_id: job.id,
            status: job.status,
            message: "Analysis job created. Check status using the job ID.".to_string(),
        }),
    ))
}

/// GET /api/v1/analyze/{job_id} — fetch a job with its result or error.
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<AnalysisJob>, (StatusCode, String)> {
    let job = state
        .orchestrator
        .get(job_id)
        .await
        .map_err(|e| (error_status(&e), e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "analysis job not found".to_string()))?;

    Ok(Json(job))
}

/// GET /api/v1/analysis/history — paginated listing with filters.
pub async fn analysis_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, (StatusCode, String)> {
    query
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let (items, total) = state
        .orchestrator
        .list(query.status, query.asset_tag.as_deref(), query.skip, query.limit)
        .await
        .map_err(|e| (error_status(&e), e.to_string()))?;

    Ok(Json(HistoryPage { items, total }))
}

/// POST /api/v1/analysis/reprocess/{job_id} — reset a terminal job and
/// schedule another execution.
pub async fn reprocess_analysis(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSummary>, (StatusCode, String)> {
    let job = state
        .orchestrator
        .reprocess(job_id)
        .await
        .map_err(|e| (error_status(&e), e.to_string()))?;

    audit::log_action(
        &state.db,
        AuditEvent {
            action: "ANALYZE_REPROCESS",
            resource_type: "analysis",
            resource_id: job.id,
            payload: None,
        },
    )
    .await;

    Ok(Json(JobSummary {
        job_id: job.id,
        status: job.status,
        message: "Analysis reprocessing started".to_string(),
    }))
}
