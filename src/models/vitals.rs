//! Vitals record and the derived BMI computation.

use serde::{Deserialize, Serialize};

/// Body measurements, one row per user. `bmi` is derived from height and
/// weight whenever either of them changes and is never trusted from a
/// caller who also changes them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VitalsInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Height in centimeters.
    #[serde(default)]
    pub height: f64,
    /// Weight in kilograms.
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub bmi: f64,
    #[serde(default)]
    pub blood_group: String,
}

/// Partial update for the vitals row.
#[derive(Debug, Clone, Default)]
pub struct VitalsUpdate {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    /// Accepted as given only when neither height nor weight is supplied in
    /// the same update; otherwise recomputed.
    pub bmi: Option<f64>,
    pub blood_group: Option<String>,
}

impl VitalsUpdate {
    pub(crate) fn apply(self, record: &mut VitalsInfo) {
        let touches_body = self.height.is_some() || self.weight.is_some();
        if let Some(v) = self.height {
            record.height = v;
        }
        if let Some(v) = self.weight {
            record.weight = v;
        }
        if let Some(v) = self.blood_group {
            record.blood_group = v;
        }
        if touches_body {
            record.bmi = compute_bmi(record.height, record.weight);
        } else if let Some(v) = self.bmi {
            record.bmi = v;
        }
    }
}

/// Body mass index from height in centimeters and weight in kilograms,
/// rounded to one decimal, half away from zero.
///
/// Not guarded: a zero height propagates `inf`/`NaN`. Input validation
/// belongs to the caller.
pub fn compute_bmi(height_cm: f64, weight_kg: f64) -> f64 {
    let meters = height_cm / 100.0;
    let raw = weight_kg / (meters * meters);
    (raw * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(170.0, 68.0 => 23.5 ; "reference pair")]
    #[test_case(200.0, 97.0 => 24.3 ; "half rounds away from zero")]
    #[test_case(180.0, 81.0 => 25.0 ; "exact value")]
    #[test_case(150.0, 45.0 => 20.0 ; "short and light")]
    fn bmi_cases(height: f64, weight: f64) -> f64 {
        compute_bmi(height, weight)
    }

    #[test]
    fn bmi_is_stable_across_calls() {
        assert_eq!(compute_bmi(163.0, 71.5), compute_bmi(163.0, 71.5));
    }

    #[test]
    fn degenerate_height_propagates() {
        assert!(compute_bmi(0.0, 70.0).is_infinite());
        assert!(compute_bmi(0.0, 0.0).is_nan());
    }

    #[test]
    fn update_with_weight_recomputes_bmi() {
        let mut record = VitalsInfo {
            height: 170.0,
            weight: 60.0,
            bmi: 20.8,
            ..Default::default()
        };
        VitalsUpdate {
            weight: Some(68.0),
            ..Default::default()
        }
        .apply(&mut record);
        assert_eq!(record.bmi, 23.5);
    }

    #[test]
    fn caller_supplied_bmi_is_overridden_when_body_changes() {
        let mut record = VitalsInfo {
            height: 170.0,
            weight: 60.0,
            ..Default::default()
        };
        VitalsUpdate {
            weight: Some(68.0),
            bmi: Some(99.9),
            ..Default::default()
        }
        .apply(&mut record);
        assert_eq!(record.bmi, 23.5);
    }

    #[test]
    fn bare_bmi_override_is_accepted() {
        let mut record = VitalsInfo {
            height: 170.0,
            weight: 68.0,
            bmi: 23.5,
            ..Default::default()
        };
        VitalsUpdate {
            bmi: Some(24.0),
            ..Default::default()
        }
        .apply(&mut record);
        assert_eq!(record.bmi, 24.0);
        assert_eq!(record.height, 170.0);
    }
}
