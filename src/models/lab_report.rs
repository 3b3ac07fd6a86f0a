//! Lab reports with nested test results.
//!
//! Reports are a per-user collection; the store assigns row ids on insert.
//! The `testresults` column carries the serialized result list, and the
//! `status` column is untrusted: anything the remote hands back outside the
//! closed set collapses to `pending`.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::codec;
use crate::error::DecodeError;

/// Closed review-state set for a lab report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabStatus {
    Normal,
    Abnormal,
    #[default]
    Pending,
}

impl LabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabStatus::Normal => "normal",
            LabStatus::Abnormal => "abnormal",
            LabStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for LabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coerce an untrusted status value into the closed set. Anything that is
/// not exactly `normal` or `abnormal` becomes `pending`.
pub fn normalize_status(raw: Option<&str>) -> LabStatus {
    match raw {
        Some("normal") => LabStatus::Normal,
        Some("abnormal") => LabStatus::Abnormal,
        _ => LabStatus::Pending,
    }
}

/// Lenient deserializer for remote status columns: tolerates null and
/// non-string values by normalizing instead of failing the row.
fn lenient_status<'de, D>(deserializer: D) -> Result<LabStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(normalize_status(raw.as_ref().and_then(Value::as_str)))
}

/// One measured component of a report, serialized inside the parent's
/// `testresults` column. Never exists outside a parent report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabTestResult {
    pub id: i64,
    pub report_id: i64,
    pub test_name: String,
    pub value: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_range: Option<String>,
    #[serde(default)]
    pub is_abnormal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_code: Option<String>,
}

/// One lab report owned by the active user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabReport {
    pub id: Option<i64>,
    pub user_id: Option<String>,
    pub name: String,
    pub date: NaiveDate,
    pub status: LabStatus,
    pub fileurl: Option<String>,
    pub results: Option<Vec<LabTestResult>>,
}

/// Wire shape of a lab report row; results travel as text.
#[derive(Serialize, Deserialize)]
struct LabReportRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default)]
    name: String,
    date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_status")]
    status: LabStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fileurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    testresults: Option<Value>,
}

impl LabReport {
    pub(crate) fn from_row(row: Value) -> Result<Self, DecodeError> {
        let row: LabReportRow = codec::decode_row("lab_reports", row)?;
        let results = match row.testresults {
            None | Some(Value::Null) => None,
            Some(column) => Some(codec::decode_column("testresults", &column)?),
        };
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            date: row.date,
            status: row.status,
            fileurl: row.fileurl,
            results,
        })
    }

    pub(crate) fn to_row(&self) -> Result<Value, DecodeError> {
        let testresults = match &self.results {
            None => None,
            Some(results) => Some(Value::String(codec::encode_column("testresults", results)?)),
        };
        codec::encode_row(
            "lab_reports",
            &LabReportRow {
                id: self.id,
                user_id: self.user_id.clone(),
                name: self.name.clone(),
                date: self.date,
                status: self.status,
                fileurl: self.fileurl.clone(),
                testresults,
            },
        )
    }
}
