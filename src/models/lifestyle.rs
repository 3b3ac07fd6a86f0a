//! Lifestyle record.

use serde::{Deserialize, Serialize};

/// Self-reported habits, one row per user. Values are free-form; no
/// cross-field constraint applies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LifestyleInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub activity_level: String,
    #[serde(default)]
    pub smoking_status: String,
    #[serde(default)]
    pub alcohol_consumption: String,
}

/// Partial update for the lifestyle row.
#[derive(Debug, Clone, Default)]
pub struct LifestyleUpdate {
    pub activity_level: Option<String>,
    pub smoking_status: Option<String>,
    pub alcohol_consumption: Option<String>,
}

impl LifestyleUpdate {
    pub(crate) fn apply(self, record: &mut LifestyleInfo) {
        if let Some(v) = self.activity_level {
            record.activity_level = v;
        }
        if let Some(v) = self.smoking_status {
            record.smoking_status = v;
        }
        if let Some(v) = self.alcohol_consumption {
            record.alcohol_consumption = v;
        }
    }
}
