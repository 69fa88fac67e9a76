use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::job::{AnalysisJob, JobStatus};

const JOB_COLUMNS: &str = "id, asset_tag, image_path, original_filename, status, result, \
                           error_message, confidence_score, created_at, completed_at, \
                           processing_time";

fn job_from_row(row: &PgRow) -> Result<AnalysisJob, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = status_str.parse().unwrap_or(JobStatus::Pending);

    Ok(AnalysisJob {
        id: row.try_get("id")?,
        asset_tag: row.try_get("asset_tag")?,
        image_path: row.try_get("image_path")?,
        original_filename: row.try_get("original_filename")?,
        status,
        result: row.try_get("result")?,
        error_message: row.try_get("error_message")?,
        confidence_score: row.try_get("confidence_score")?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
        processing_time: row.try_get("processing_time")?,
    })
}

/// Insert a new pending analysis job
pub async fn create_job(
    pool: &PgPool,
    id: Uuid,
    asset_tag: Option<&str>,
    image_path: &str,
    original_filename: Option<&str>,
) -> Result<AnalysisJob, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO analysis_jobs (id, asset_tag, image_path, original_filename, status)
        VALUES ($1, $2, $3, $4, 'pending')
        RETURNING {JOB_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(asset_tag)
    .bind(image_path)
    .bind(original_filename)
    .fetch_one(pool)
    .await?;

    job_from_row(&row)
}

/// Get a job by ID
pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<AnalysisJob>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM analysis_jobs
        WHERE id = $1
        "#,
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// List jobs newest-first with optional status/asset-tag filters,
/// returning the page and the unpaginated total.
pub async fn list_jobs(
    pool: &PgPool,
    status: Option<JobStatus>,
    asset_tag: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<(Vec<AnalysisJob>, i64), sqlx::Error> {
    let status_str = status.map(|s| s.to_string());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM analysis_jobs
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR asset_tag = $2)
        "#,
    )
    .bind(status_str.as_deref())
    .bind(asset_tag)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM analysis_jobs
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR asset_tag = $2)
        ORDER BY created_at DESC
        OFFSET $3 LIMIT $4
        "#,
    ))
    .bind(status_str.as_deref())
    .bind(asset_tag)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let items = rows
        .iter()
        .map(job_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((items, total))
}

/// Transition a job into the processing state.
pub async fn mark_processing(pool: &PgPool, job_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE analysis_jobs
        SET status = 'processing'
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Terminal write for a successful analysis. A single statement so the
/// result, confidence, and completion stamps land atomically.
pub async fn complete_job(
    pool: &PgPool,
    job_id: Uuid,
    result: &serde_json::Value,
    confidence_score: f64,
    processing_time: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE analysis_jobs
        SET status = 'completed',
            result = $1,
            confidence_score = $2,
            error_message = NULL,
            completed_at = NOW(),
            processing_time = $3
        WHERE id = $4
        "#,
    )
    .bind(result)
    .bind(confidence_score)
    .bind(processing_time)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Terminal write for a failed analysis.
pub async fn fail_job(
    pool: &PgPool,
    job_id: Uuid,
    error_message: &str,
    processing_time: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE analysis_jobs
        SET status = 'failed',
            result = NULL,
            confidence_score = NULL,
            error_message = $1,
            completed_at = NOW(),
            processing_time = $2
        WHERE id = $3
        "#,
    )
    .bind(error_message)
    .bind(processing_time)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Reset a terminal job to pending for reprocessing, clearing every
/// result and completion field.
pub async fn reset_job(pool: &PgPool, job_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE analysis_jobs
        SET status = 'pending',
            result = NULL,
            error_message = NULL,
            confidence_score = NULL,
            completed_at = NULL,
            processing_time = NULL
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}
