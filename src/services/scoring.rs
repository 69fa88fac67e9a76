use crate::models::analysis::AnalysisResult;

/// Derive a single confidence scalar in `[0, 1]` from a model result.
///
/// Averages whatever signal groups are present: per-tag confidences,
/// a fixed image-quality mapping, and a coarse equipment-detail
/// signal. Missing groups are omitted from the average rather than
/// counted as zero; with no signals at all the neutral 0.5 is
/// returned. Deterministic and total.
pub fn score(result: &AnalysisResult) -> f64 {
    let mut scores: Vec<f64> = Vec::new();

    if !result.asset_tags.is_empty() {
        scores.extend(result.asset_tags.iter().map(|t| t.confidence));
    }

    if let Some(quality) = result.image_quality.as_deref() {
        scores.push(quality_score(quality));
    }

    // An equipment list that is present but empty still contributes
    // the low-detail branch; an absent list contributes nothing.
    if let Some(equipment) = result.equipment.as_deref() {
        scores.push(if equipment.is_empty() { 0.3 } else { 0.8 });
    }

    if scores.is_empty() {
        return 0.5;
    }

    let average = scores.iter().sum::<f64>() / scores.len() as f64;
    average.clamp(0.0, 1.0)
}

fn quality_score(label: &str) -> f64 {
    match label.to_lowercase().as_str() {
        "excellent" => 1.0,
        "good" => 0.8,
        "fair" => 0.6,
        "poor" => 0.3,
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{EquipmentObservation, TagObservation};

    fn tag(confidence: f64) -> TagObservation {
        TagObservation {
            tag: "GYM-001".to_string(),
            confidence,
            location_description: None,
        }
    }

    #[test]
    fn empty_result_scores_neutral_default() {
        assert_eq!(score(&AnalysisResult::default()), 0.5);
    }

    #[test]
    fn quality_and_equipment_average() {
        // No tag observations: (0.8 quality + 0.8 equipment) / 2.
        let result = AnalysisResult {
            equipment: Some(vec![EquipmentObservation::default()]),
            image_quality: Some("good".to_string()),
            ..Default::default()
        };
        assert!((score(&result) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn each_tag_confidence_counts_separately() {
        let result = AnalysisResult {
            asset_tags: vec![tag(1.0), tag(0.5)],
            image_quality: Some("excellent".to_string()),
            ..Default::default()
        };
        // (1.0 + 0.5 + 1.0) / 3
        assert!((score(&result) - 2.5 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_equipment_list_contributes_low_detail_signal() {
        let present_empty = AnalysisResult {
            equipment: Some(vec![]),
            ..Default::default()
        };
        let absent = AnalysisResult::default();

        assert!((score(&present_empty) - 0.3).abs() < 1e-9);
        assert_eq!(score(&absent), 0.5);
    }

    #[test]
    fn unknown_quality_label_maps_to_neutral() {
        let result = AnalysisResult {
            image_quality: Some("blurry".to_string()),
            ..Default::default()
        };
        assert_eq!(score(&result), 0.5);
    }

    #[test]
    fn score_stays_in_unit_interval() {
        // Even with out-of-range per-tag confidences from the model.
        let result = AnalysisResult {
            asset_tags: vec![tag(3.0), tag(-1.0)],
            image_quality: Some("poor".to_string()),
            equipment: Some(vec![EquipmentObservation::default()]),
            ..Default::default()
        };
        let s = score(&result);
        assert!((0.0..=1.0).contains(&s));
    }
}
