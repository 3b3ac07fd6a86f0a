//! Personal information record.

use serde::{Deserialize, Serialize};

/// Identity and household details, one row per user. All fields default to
/// empty/zero when the remote row omits them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub marital_status: String,
    #[serde(default)]
    pub children: u32,
}

/// Partial update; only supplied fields are written onto the record.
#[derive(Debug, Clone, Default)]
pub struct PersonalInfoUpdate {
    pub full_name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub marital_status: Option<String>,
    pub children: Option<u32>,
}

impl PersonalInfoUpdate {
    pub(crate) fn apply(self, record: &mut PersonalInfo) {
        if let Some(v) = self.full_name {
            record.full_name = v;
        }
        if let Some(v) = self.age {
            record.age = v;
        }
        if let Some(v) = self.gender {
            record.gender = v;
        }
        if let Some(v) = self.address {
            record.address = v;
        }
        if let Some(v) = self.marital_status {
            record.marital_status = v;
        }
        if let Some(v) = self.children {
            record.children = v;
        }
    }
}
