use sqlx::PgPool;
use uuid::Uuid;

/// Structured audit event emitted by the pipeline at submission and
/// reprocess. Persistence belongs to the audit collaborator; this
/// module writes on its behalf and never fails the request over it.
#[derive(Debug)]
pub struct AuditEvent<'a> {
    pub action: &'a str,
    pub resource_type: &'a str,
    pub resource_id: Uuid,
    pub payload: Option<serde_json::Value>,
}

pub async fn log_action(pool: &PgPool, event: AuditEvent<'_>) {
    let outcome = sqlx::query(
        r#"
        INSERT INTO audit_logs (action, resource_type, resource_id, payload)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(event.action)
    .bind(event.resource_type)
    .bind(event.resource_id.to_string())
    .bind(&event.payload)
    .execute(pool)
    .await;

    if let Err(e) = outcome {
        tracing::warn!(
            action = event.action,
            resource_id = %event.resource_id,
            error = %e,
            "Failed to record audit event"
        );
    }
}
