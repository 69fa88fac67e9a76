use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Canonical equipment condition vocabulary.
///
/// The reconciler only ever writes one of these labels; anything the
/// vision model reports outside this set (e.g. "rusty") is ignored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "title_case", ascii_case_insensitive)]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// A tracked piece of gym equipment, keyed by its canonical asset tag.
///
/// Owned by the asset collaborator; the analysis pipeline only reads it
/// by tag and writes back condition/weight/description and the
/// seen/update timestamps during reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub asset_tag: String,
    pub name: Option<String>,
    pub item_type: String,
    pub description: Option<String>,
    pub location: String,
    pub status: String,
    pub condition: String,
    pub weight: Option<String>,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_parses_case_insensitively_to_title_case() {
        assert_eq!("good".parse::<Condition>().unwrap(), Condition::Good);
        assert_eq!("EXCELLENT".parse::<Condition>().unwrap(), Condition::Excellent);
        assert_eq!(Condition::Fair.to_string(), "Fair");
        assert_eq!(Condition::Poor.to_string(), "Poor");
    }

    #[test]
    fn unrecognized_condition_is_rejected() {
        assert!("rusty".parse::<Condition>().is_err());
        assert!("unknown".parse::<Condition>().is_err());
        assert!("".parse::<Condition>().is_err());
    }
}
