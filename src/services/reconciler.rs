use chrono::Utc;
use sqlx::PgPool;

use crate::db::asset_queries;
use crate::models::analysis::{AnalysisResult, EquipmentObservation};
use crate::models::asset::{Asset, Condition};
use crate::models::job::AnalysisJob;

/// Best-effort merge of a completed job's findings into the matching
/// asset record. Never raises to the caller: any failure is logged and
/// swallowed so it cannot change the job's recorded outcome.
pub async fn reconcile(pool: &PgPool, job: &AnalysisJob) {
    if let Err(e) = try_reconcile(pool, job).await {
        tracing::warn!(
            job_id = %job.id,
            asset_tag = job.asset_tag.as_deref().unwrap_or("-"),
            error = %e,
            "Asset auto-update failed"
        );
    }
}

async fn try_reconcile(pool: &PgPool, job: &AnalysisJob) -> Result<(), sqlx::Error> {
    let (Some(tag), Some(result_value)) = (job.asset_tag.as_deref(), job.result.as_ref()) else {
        return Ok(());
    };

    let result: AnalysisResult = match serde_json::from_value(result_value.clone()) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(job_id = %job.id, error = %e, "Stored result is not a structured analysis");
            return Ok(());
        }
    };

    let Some(mut asset) = asset_queries::find_by_tag(pool, tag).await? else {
        tracing::debug!(job_id = %job.id, asset_tag = tag, "No matching asset, skipping update");
        return Ok(());
    };

    // The asset was just seen in a photo, whatever else the model found.
    asset.last_seen = Utc::now();

    let observation = result
        .equipment
        .as_deref()
        .and_then(|list| list.first());
    let changed = match observation {
        Some(obs) => apply_observation(&mut asset, obs),
        None => false,
    };

    asset.updated_at = Utc::now();
    asset_queries::save_reconciled(pool, &asset).await?;

    tracing::info!(
        job_id = %job.id,
        asset_tag = %asset.asset_tag,
        fields_changed = changed,
        "Asset record reconciled"
    );

    Ok(())
}

/// Merge one equipment observation into an asset. Returns whether any
/// field beyond the seen/update timestamps changed.
///
/// Only the first observation of a result is ever applied, and each
/// field has its own guard: condition needs a recognized vocabulary
/// label that differs from the current value, weight and description
/// fill blanks only.
fn apply_observation(asset: &mut Asset, observation: &EquipmentObservation) -> bool {
    let mut changed = false;

    if let Some(condition) = observation
        .condition
        .as_deref()
        .and_then(|c| c.parse::<Condition>().ok())
    {
        let canonical = condition.to_string();
        if asset.condition != canonical {
            asset.condition = canonical;
            changed = true;
        }
    }

    if asset.weight.as_deref().map_or(true, str::is_empty) {
        if let Some(weight) = observation.weight.as_deref() {
            if weight != "unknown" && !weight.is_empty() {
                asset.weight = Some(weight.to_string());
                changed = true;
            }
        }
    }

    if asset.description.as_deref().map_or(true, str::is_empty) {
        if let Some(description) = observation.description.as_deref() {
            if !description.is_empty() {
                asset.description = Some(description.to_string());
                changed = true;
            }
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn asset() -> Asset {
        Asset {
            id: Uuid::new_v4(),
            asset_tag: "T1".to_string(),
            name: Some("Hex dumbbell".to_string()),
            item_type: "dumbbell".to_string(),
            description: None,
            location: "Free weights".to_string(),
            status: "Active".to_string(),
            condition: "Good".to_string(),
            weight: None,
            last_seen: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            notes: None,
        }
    }

    fn observation() -> EquipmentObservation {
        EquipmentObservation {
            equipment_type: Some("dumbbell".to_string()),
            weight: Some("25 lbs".to_string()),
            description: Some("rubber hex dumbbell".to_string()),
            condition: Some("good".to_string()),
            suggested_asset_tag: None,
            location_in_image: None,
        }
    }

    #[test]
    fn fills_empty_weight_and_description() {
        let mut a = asset();
        let changed = apply_observation(&mut a, &observation());

        assert!(changed);
        assert_eq!(a.weight.as_deref(), Some("25 lbs"));
        assert_eq!(a.description.as_deref(), Some("rubber hex dumbbell"));
    }

    #[test]
    fn never_overwrites_existing_weight_or_description() {
        let mut a = asset();
        a.weight = Some("30 lbs".to_string());
        a.description = Some("original description".to_string());
        a.condition = "Good".to_string();

        let changed = apply_observation(&mut a, &observation());

        assert!(!changed);
        assert_eq!(a.weight.as_deref(), Some("30 lbs"));
        assert_eq!(a.description.as_deref(), Some("original description"));
    }

    #[test]
    fn unknown_weight_literal_is_not_a_value() {
        let mut a = asset();
        let mut obs = observation();
        obs.weight = Some("unknown".to_string());
        obs.description = None;

        apply_observation(&mut a, &obs);
        assert!(a.weight.is_none());
    }

    #[test]
    fn condition_updates_only_within_vocabulary() {
        let mut a = asset();
        let mut obs = observation();

        obs.condition = Some("rusty".to_string());
        apply_observation(&mut a, &obs);
        assert_eq!(a.condition, "Good");

        obs.condition = Some("poor".to_string());
        apply_observation(&mut a, &obs);
        assert_eq!(a.condition, "Poor");
    }

    #[test]
    fn matching_condition_is_not_a_change() {
        let mut a = asset();
        a.weight = Some("25 lbs".to_string());
        a.description = Some("existing".to_string());

        let mut obs = observation();
        obs.condition = Some("good".to_string());

        assert!(!apply_observation(&mut a, &obs));
    }
}
