//! Longitudinal health metrics.
//!
//! All metrics for a user live in one row whose `metrics` column holds the
//! serialized dictionary. The metric key set is fixed at schema definition
//! time: readings can only be appended to a key already present in the
//! document.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec;
use crate::error::{DecodeError, SyncError};

/// Inclusive bounds a reading is expected to stay within.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalRange {
    pub min: f64,
    pub max: f64,
}

/// One time-series point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub id: String,
    pub date: NaiveDate,
    pub value: f64,
}

/// One tracked metric: display metadata plus its date-ordered readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NormalRange>,
    #[serde(default)]
    pub readings: Vec<MetricReading>,
}

fn metric(name: &str, unit: &str, range: Option<(f64, f64)>) -> Metric {
    Metric {
        name: name.into(),
        unit: unit.into(),
        range: range.map(|(min, max)| NormalRange { min, max }),
        readings: Vec::new(),
    }
}

static CATALOG: Lazy<BTreeMap<String, Metric>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "blood_glucose".to_string(),
            metric("Blood Glucose", "mg/dL", Some((70.0, 100.0))),
        ),
        (
            "blood_pressure_systolic".to_string(),
            metric("Blood Pressure (Systolic)", "mmHg", Some((90.0, 120.0))),
        ),
        (
            "blood_pressure_diastolic".to_string(),
            metric("Blood Pressure (Diastolic)", "mmHg", Some((60.0, 80.0))),
        ),
        (
            "heart_rate".to_string(),
            metric("Heart Rate", "bpm", Some((60.0, 100.0))),
        ),
        (
            "body_temperature".to_string(),
            metric("Body Temperature", "°C", Some((36.1, 37.2))),
        ),
        (
            "oxygen_saturation".to_string(),
            metric("Oxygen Saturation", "%", Some((95.0, 100.0))),
        ),
    ])
});

/// The fixed metric dictionary every new document starts from.
pub fn default_catalog() -> BTreeMap<String, Metric> {
    CATALOG.clone()
}

/// The per-user metrics document.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsDocument {
    pub id: Option<i64>,
    pub user_id: Option<String>,
    pub metrics: BTreeMap<String, Metric>,
}

impl Default for MetricsDocument {
    fn default() -> Self {
        Self {
            id: None,
            user_id: None,
            metrics: default_catalog(),
        }
    }
}

/// Wire shape of the metrics row; the dictionary travels as text.
#[derive(Serialize, Deserialize)]
struct MetricsRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metrics: Option<Value>,
}

impl MetricsDocument {
    /// Append a reading to `metric_key` and restore date order.
    ///
    /// Fails without touching the document when the key is not part of the
    /// fixed dictionary. The re-sort is stable, so readings sharing a date
    /// keep their insertion order.
    pub fn add_reading(
        &mut self,
        metric_key: &str,
        date: NaiveDate,
        value: f64,
    ) -> Result<(), SyncError> {
        let entry = self
            .metrics
            .get_mut(metric_key)
            .ok_or_else(|| SyncError::MetricNotFound(metric_key.to_string()))?;
        entry.readings.push(MetricReading {
            id: reading_id(metric_key),
            date,
            value,
        });
        entry.readings.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(())
    }

    pub(crate) fn from_row(row: Value) -> Result<Self, DecodeError> {
        let row: MetricsRow = codec::decode_row("metrics_info", row)?;
        let metrics = match row.metrics {
            None | Some(Value::Null) => default_catalog(),
            Some(column) => codec::decode_column("metrics", &column)?,
        };
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            metrics,
        })
    }

    pub(crate) fn to_row(&self) -> Result<Value, DecodeError> {
        let text = codec::encode_column("metrics", &self.metrics)?;
        codec::encode_row(
            "metrics_info",
            &MetricsRow {
                id: self.id,
                user_id: self.user_id.clone(),
                metrics: Some(Value::String(text)),
            },
        )
    }
}

/// Reading identifier: metric key plus creation timestamp in milliseconds.
/// Append-safe under the single-writer assumption only.
fn reading_id(metric_key: &str) -> String {
    format!("{metric_key}{}", Utc::now().timestamp_millis())
}
