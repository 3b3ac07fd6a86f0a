//! Record types for the five channels.
//!
//! Field names on these types are the remote wire contract and must
//! round-trip exactly; `id` and `user_id` are the store envelope, absent
//! until a row is first persisted.

pub mod lab_report;
pub mod lifestyle;
pub mod metrics;
pub mod personal_info;
pub mod vitals;

pub use lab_report::{normalize_status, LabReport, LabStatus, LabTestResult};
pub use lifestyle::{LifestyleInfo, LifestyleUpdate};
pub use metrics::{Metric, MetricReading, MetricsDocument, NormalRange};
pub use personal_info::{PersonalInfo, PersonalInfoUpdate};
pub use vitals::{compute_bmi, VitalsInfo, VitalsUpdate};
