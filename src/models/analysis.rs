use serde::{Deserialize, Serialize};

/// Structured output of one vision-model invocation.
///
/// All fields are lenient: the model is asked for a fixed schema but
/// real replies drop or rename fields, so everything optional stays
/// optional and unknown keys are ignored. The distinction between an
/// absent and an empty `equipment` list matters to the confidence
/// scorer, hence `Option<Vec<_>>` rather than a defaulted `Vec`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisResult {
    #[serde(default)]
    pub asset_tags: Vec<TagObservation>,
    pub equipment: Option<Vec<EquipmentObservation>>,
    pub image_quality: Option<String>,
    pub total_items: Option<i64>,
    pub recommendations: Option<String>,
}

/// A detected asset tag, sticker, or engraved identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagObservation {
    pub tag: String,
    #[serde(default)]
    pub confidence: f64,
    pub location_description: Option<String>,
}

/// A single piece of equipment detected in the image.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EquipmentObservation {
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
    /// Weight string as reported, e.g. "25 lbs", or the literal "unknown".
    pub weight: Option<String>,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub suggested_asset_tag: Option<String>,
    pub location_in_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_full_model_reply() {
        let raw = r#"{
            "asset_tags": [
                {"tag": "GYM-042", "confidence": 0.95, "location_description": "front plate"}
            ],
            "equipment": [
                {"type": "dumbbell", "weight": "25 lbs", "description": "rubber hex dumbbell",
                 "condition": "good", "location_in_image": "center"}
            ],
            "image_quality": "good",
            "total_items": 1,
            "recommendations": "none"
        }"#;

        let result: AnalysisResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.asset_tags.len(), 1);
        assert_eq!(result.asset_tags[0].tag, "GYM-042");
        let equipment = result.equipment.as_ref().unwrap();
        assert_eq!(equipment[0].weight.as_deref(), Some("25 lbs"));
        assert_eq!(result.image_quality.as_deref(), Some("good"));
    }

    #[test]
    fn empty_object_is_valid() {
        let result: AnalysisResult = serde_json::from_str("{}").unwrap();
        assert!(result.asset_tags.is_empty());
        assert!(result.equipment.is_none());
        assert!(result.image_quality.is_none());
    }

    #[test]
    fn absent_and_empty_equipment_are_distinct() {
        let absent: AnalysisResult = serde_json::from_str("{}").unwrap();
        let empty: AnalysisResult = serde_json::from_str(r#"{"equipment": []}"#).unwrap();
        assert!(absent.equipment.is_none());
        assert_eq!(empty.equipment.as_ref().map(Vec::len), Some(0));
    }
}
