//! The five record channels.
//!
//! Four channels are single-row: personal info, vitals, lifestyle, and the
//! metrics document. Each binds a [`ChannelSchema`] to the shared
//! [`SingleRowChannel`] coordinator. Lab reports are multi-row and get their
//! own channel with append and delete operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::channel::{ChannelSchema, SingleRowChannel};
use crate::codec;
use crate::error::{DecodeError, Result, SyncError};
use crate::identity::IdentityProvider;
use crate::models::{
    LabReport, LifestyleInfo, LifestyleUpdate, MetricsDocument, PersonalInfo, PersonalInfoUpdate,
    VitalsInfo, VitalsUpdate,
};
use crate::notify::{Notification, Notifier};
use crate::store::{tables, RecordStore};

/// Demographics and contact details, one row per user.
pub struct PersonalInfoSchema;

impl ChannelSchema for PersonalInfoSchema {
    type Record = PersonalInfo;
    type Update = PersonalInfoUpdate;

    const TABLE: &'static str = tables::PERSONAL_INFO;
    const LABEL: &'static str = "Personal information";

    fn apply_update(record: &mut PersonalInfo, update: PersonalInfoUpdate) {
        update.apply(record);
    }

    fn decode(row: Value) -> std::result::Result<PersonalInfo, DecodeError> {
        codec::decode_row(Self::TABLE, row)
    }

    fn encode(record: &PersonalInfo) -> std::result::Result<Value, DecodeError> {
        codec::encode_row(Self::TABLE, record)
    }

    fn row_id(record: &PersonalInfo) -> Option<i64> {
        record.id
    }

    fn set_row_identity(record: &mut PersonalInfo, id: Option<i64>, user_id: &str) {
        record.id = id;
        record.user_id = Some(user_id.to_owned());
    }
}

/// Body measurements, one row per user. BMI is derived inside
/// [`VitalsUpdate::apply`] whenever height or weight moves.
pub struct VitalsSchema;

impl ChannelSchema for VitalsSchema {
    type Record = VitalsInfo;
    type Update = VitalsUpdate;

    const TABLE: &'static str = tables::VITALS;
    const LABEL: &'static str = "Vitals";

    fn apply_update(record: &mut VitalsInfo, update: VitalsUpdate) {
        update.apply(record);
    }

    fn decode(row: Value) -> std::result::Result<VitalsInfo, DecodeError> {
        codec::decode_row(Self::TABLE, row)
    }

    fn encode(record: &VitalsInfo) -> std::result::Result<Value, DecodeError> {
        codec::encode_row(Self::TABLE, record)
    }

    fn row_id(record: &VitalsInfo) -> Option<i64> {
        record.id
    }

    fn set_row_identity(record: &mut VitalsInfo, id: Option<i64>, user_id: &str) {
        record.id = id;
        record.user_id = Some(user_id.to_owned());
    }
}

/// Habits and activity, one row per user.
pub struct LifestyleSchema;

impl ChannelSchema for LifestyleSchema {
    type Record = LifestyleInfo;
    type Update = LifestyleUpdate;

    const TABLE: &'static str = tables::LIFESTYLE;
    const LABEL: &'static str = "Lifestyle";

    fn apply_update(record: &mut LifestyleInfo, update: LifestyleUpdate) {
        update.apply(record);
    }

    fn decode(row: Value) -> std::result::Result<LifestyleInfo, DecodeError> {
        codec::decode_row(Self::TABLE, row)
    }

    fn encode(record: &LifestyleInfo) -> std::result::Result<Value, DecodeError> {
        codec::encode_row(Self::TABLE, record)
    }

    fn row_id(record: &LifestyleInfo) -> Option<i64> {
        record.id
    }

    fn set_row_identity(record: &mut LifestyleInfo, id: Option<i64>, user_id: &str) {
        record.id = id;
        record.user_id = Some(user_id.to_owned());
    }
}

/// The tracked-metrics document, one row per user with the catalog stored
/// as a text column. An update replaces the whole catalog.
pub struct MetricsSchema;

impl ChannelSchema for MetricsSchema {
    type Record = MetricsDocument;
    type Update = MetricsDocument;

    const TABLE: &'static str = tables::METRICS;
    const LABEL: &'static str = "Health metrics";

    fn apply_update(record: &mut MetricsDocument, update: MetricsDocument) {
        record.metrics = update.metrics;
    }

    fn decode(row: Value) -> std::result::Result<MetricsDocument, DecodeError> {
        MetricsDocument::from_row(row)
    }

    fn encode(record: &MetricsDocument) -> std::result::Result<Value, DecodeError> {
        record.to_row()
    }

    fn row_id(record: &MetricsDocument) -> Option<i64> {
        record.id
    }

    fn set_row_identity(record: &mut MetricsDocument, id: Option<i64>, user_id: &str) {
        record.id = id;
        record.user_id = Some(user_id.to_owned());
    }
}

pub type PersonalInfoChannel = SingleRowChannel<PersonalInfoSchema>;
pub type VitalsChannel = SingleRowChannel<VitalsSchema>;
pub type LifestyleChannel = SingleRowChannel<LifestyleSchema>;
pub type MetricsChannel = SingleRowChannel<MetricsSchema>;

impl MetricsChannel {
    /// Append a reading to a declared metric and persist the document.
    ///
    /// An undeclared metric key is rejected before any remote call and the
    /// cached document stays as it was.
    pub async fn add_reading(&self, metric_key: &str, date: NaiveDate, value: f64) -> bool {
        match self.try_add_reading(metric_key, date, value).await {
            Ok(()) => {
                self.notifier().notify(Notification::success(
                    MetricsSchema::LABEL,
                    format!("Reading recorded for {metric_key}"),
                ));
                true
            }
            Err(err) => {
                warn!(metric_key, %err, "add_reading failed");
                self.notifier()
                    .notify(Notification::failure(MetricsSchema::LABEL, err.to_string()));
                false
            }
        }
    }

    pub(crate) async fn try_add_reading(
        &self,
        metric_key: &str,
        date: NaiveDate,
        value: f64,
    ) -> Result<()> {
        let mut document = self.snapshot().await;
        document.add_reading(metric_key, date, value)?;
        self.try_upsert(document).await
    }
}

const LAB_REPORTS_LABEL: &str = "Lab reports";

/// Lab reports: many rows per user, appended and deleted individually.
///
/// Fetched rows pass through status normalization in
/// [`LabReport::from_row`]; self-written reports keep their status exactly
/// as given because the cache takes the local value after insert.
pub struct LabReportsChannel {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    cache: RwLock<Vec<LabReport>>,
    loading: AtomicBool,
    write_gate: Mutex<()>,
}

impl LabReportsChannel {
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
            cache: RwLock::new(Vec::new()),
            loading: AtomicBool::new(true),
            write_gate: Mutex::new(()),
        }
    }

    /// Current cached reports.
    pub async fn snapshot(&self) -> Vec<LabReport> {
        self.cache.read().await.clone()
    }

    /// True until the first load attempt completes.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Fetch every report belonging to the user.
    ///
    /// Rows that fail to decode are logged and skipped so one malformed row
    /// cannot hide the rest. Read failures are absorbed.
    #[instrument(skip(self), fields(table = tables::LAB_REPORTS))]
    pub async fn load(&self) {
        let Some(user_id) = self.identity.current() else {
            self.loading.store(false, Ordering::SeqCst);
            return;
        };
        match self.store.find_all(tables::LAB_REPORTS, &user_id).await {
            Ok(rows) => {
                let mut reports = Vec::with_capacity(rows.len());
                for row in rows {
                    match LabReport::from_row(row) {
                        Ok(report) => reports.push(report),
                        Err(err) => warn!(%err, "skipping undecodable lab report row"),
                    }
                }
                debug!(count = reports.len(), "lab reports loaded");
                *self.cache.write().await = reports;
            }
            Err(err) => warn!(%err, "lab report load absorbed, cache keeps prior value"),
        }
        self.loading.store(false, Ordering::SeqCst);
    }

    /// Persist a new report and append it to the cache.
    pub async fn add(&self, report: LabReport) -> bool {
        match self.try_add(report).await {
            Ok(()) => {
                self.notifier
                    .notify(Notification::success(LAB_REPORTS_LABEL, "Report added"));
                true
            }
            Err(err) => {
                warn!(%err, "lab report add failed");
                self.notifier
                    .notify(Notification::failure(LAB_REPORTS_LABEL, err.to_string()));
                false
            }
        }
    }

    #[instrument(skip(self, report), fields(table = tables::LAB_REPORTS))]
    pub(crate) async fn try_add(&self, report: LabReport) -> Result<()> {
        let user_id = self.identity.current().ok_or(SyncError::NotAuthenticated)?;
        let _gate = self.write_gate.lock().await;

        let mut report = report;
        report.id = None;
        report.user_id = Some(user_id);

        let row = report.to_row()?;
        let stored = self
            .store
            .insert(tables::LAB_REPORTS, row)
            .await
            .map_err(|source| SyncError::write(tables::LAB_REPORTS, source))?;

        report.id = stored.get("id").and_then(Value::as_i64);
        self.cache.write().await.push(report);
        info!("lab report added");
        Ok(())
    }

    /// Delete one report by id, remotely and then from the cache.
    pub async fn delete(&self, report_id: i64) -> bool {
        match self.try_delete(report_id).await {
            Ok(()) => {
                self.notifier
                    .notify(Notification::success(LAB_REPORTS_LABEL, "Report deleted"));
                true
            }
            Err(err) => {
                warn!(report_id, %err, "lab report delete failed");
                self.notifier
                    .notify(Notification::failure(LAB_REPORTS_LABEL, err.to_string()));
                false
            }
        }
    }

    #[instrument(skip(self), fields(table = tables::LAB_REPORTS))]
    pub(crate) async fn try_delete(&self, report_id: i64) -> Result<()> {
        let user_id = self.identity.current().ok_or(SyncError::NotAuthenticated)?;
        let _gate = self.write_gate.lock().await;

        // The store scopes the delete by report id and owner together, so a
        // foreign id cannot remove another user's row.
        self.store
            .delete(tables::LAB_REPORTS, report_id, &user_id)
            .await
            .map_err(|source| SyncError::write(tables::LAB_REPORTS, source))?;

        let mut cache = self.cache.write().await;
        if let Some(position) = cache.iter().position(|report| report.id == Some(report_id)) {
            cache.remove(position);
        }
        info!(report_id, "lab report deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabStatus, LabTestResult};
    use crate::notify::Severity;
    use crate::store::{MockRecordStore, StoreError};
    use crate::identity::SessionIdentity;
    use mockall::predicate::eq;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingNotifier {
        events: std::sync::Mutex<Vec<Notification>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.events.lock().unwrap().push(notification);
        }
    }

    impl RecordingNotifier {
        fn severities(&self) -> Vec<Severity> {
            self.events.lock().unwrap().iter().map(|n| n.severity).collect()
        }
    }

    fn build<S: ChannelSchema>(
        store: MockRecordStore,
        identity: SessionIdentity,
    ) -> (SingleRowChannel<S>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = SingleRowChannel::new(Arc::new(store), Arc::new(identity), notifier.clone());
        (channel, notifier)
    }

    fn build_lab(
        store: MockRecordStore,
        identity: SessionIdentity,
    ) -> (LabReportsChannel, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = LabReportsChannel::new(Arc::new(store), Arc::new(identity), notifier.clone());
        (channel, notifier)
    }

    fn signed_in() -> SessionIdentity {
        SessionIdentity::new(Some("user-1".into()))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_write_touches_nothing_remote() {
        let mut store = MockRecordStore::new();
        store.expect_find_one().never();
        store.expect_insert().never();
        store.expect_update().never();
        let (channel, notifier) =
            build::<PersonalInfoSchema>(store, SessionIdentity::signed_out());

        let update = PersonalInfoUpdate {
            full_name: Some("Ada".into()),
            ..Default::default()
        };
        assert!(!channel.upsert(update).await);
        assert_eq!(channel.snapshot().await, PersonalInfo::default());
        assert_eq!(notifier.severities(), vec![Severity::Error]);
    }

    #[tokio::test]
    async fn first_write_inserts_with_owner() {
        let mut store = MockRecordStore::new();
        store
            .expect_find_one()
            .with(eq(tables::PERSONAL_INFO), eq("user-1"))
            .times(1)
            .returning(|_, _| Ok(None));
        store
            .expect_insert()
            .withf(|table, row| {
                table == tables::PERSONAL_INFO
                    && row.get("id").is_none()
                    && row["user_id"] == json!("user-1")
                    && row["full_name"] == json!("Ada Lovelace")
            })
            .times(1)
            .returning(|_, row| {
                let mut stored = row;
                stored["id"] = json!(11);
                Ok(stored)
            });
        let (channel, notifier) = build::<PersonalInfoSchema>(store, signed_in());

        let update = PersonalInfoUpdate {
            full_name: Some("Ada Lovelace".into()),
            age: Some(36),
            ..Default::default()
        };
        assert!(channel.upsert(update).await);

        let cached = channel.snapshot().await;
        assert_eq!(cached.id, Some(11));
        assert_eq!(cached.user_id.as_deref(), Some("user-1"));
        assert_eq!(cached.full_name, "Ada Lovelace");
        assert_eq!(cached.age, 36);
        assert_eq!(notifier.severities(), vec![Severity::Success]);
    }

    #[tokio::test]
    async fn second_write_updates_the_existing_row() {
        let mut store = MockRecordStore::new();
        store.expect_find_one().times(1).returning(|_, _| {
            Ok(Some(json!({
                "id": 4,
                "user_id": "user-1",
                "activity_level": "moderate",
                "smoking_status": "never",
                "alcohol_consumption": "none"
            })))
        });
        store
            .expect_update()
            .withf(|table, row_id, fields| {
                table == tables::LIFESTYLE
                    && *row_id == 4
                    && fields["activity_level"] == json!("high")
                    && fields.get("id").is_none()
            })
            .times(1)
            .returning(|_, _, fields| {
                let mut stored = fields;
                stored["id"] = json!(4);
                Ok(stored)
            });
        let (channel, _) = build::<LifestyleSchema>(store, signed_in());

        let update = LifestyleUpdate {
            activity_level: Some("high".into()),
            ..Default::default()
        };
        assert!(channel.upsert(update).await);

        let cached = channel.snapshot().await;
        assert_eq!(cached.id, Some(4));
        assert_eq!(cached.activity_level, "high");
    }

    #[tokio::test]
    async fn write_failure_leaves_cache_untouched() {
        let mut store = MockRecordStore::new();
        store.expect_find_one().returning(|_, _| Ok(None));
        store
            .expect_insert()
            .returning(|_, _| Err(StoreError::Transport("connection reset".into())));
        let (channel, notifier) = build::<VitalsSchema>(store, signed_in());

        let before = channel.snapshot().await;
        let update = VitalsUpdate {
            height: Some(170.0),
            weight: Some(68.0),
            ..Default::default()
        };
        assert!(!channel.upsert(update).await);
        assert_eq!(channel.snapshot().await, before);
        assert_eq!(notifier.severities(), vec![Severity::Error]);
    }

    #[tokio::test]
    async fn failed_existence_check_skips_the_write() {
        let mut store = MockRecordStore::new();
        store.expect_find_one().times(1).returning(|_, _| {
            Err(StoreError::Api {
                status: 500,
                message: "backend unavailable".into(),
            })
        });
        store.expect_insert().never();
        store.expect_update().never();
        let (channel, _) = build::<VitalsSchema>(store, signed_in());

        let update = VitalsUpdate {
            weight: Some(70.0),
            ..Default::default()
        };
        assert!(!channel.upsert(update).await);
    }

    #[tokio::test]
    async fn load_populates_cache_and_clears_flag() {
        let mut store = MockRecordStore::new();
        store.expect_find_one().times(1).returning(|_, _| {
            Ok(Some(json!({
                "id": 2,
                "user_id": "user-1",
                "height": 180.0,
                "weight": 81.0,
                "bmi": 25.0,
                "blood_group": "O+"
            })))
        });
        let (channel, _) = build::<VitalsSchema>(store, signed_in());

        assert!(channel.is_loading());
        channel.load().await;
        assert!(!channel.is_loading());

        let cached = channel.snapshot().await;
        assert_eq!(cached.id, Some(2));
        assert_eq!(cached.height, 180.0);
        assert_eq!(cached.blood_group, "O+");
    }

    #[tokio::test]
    async fn load_without_row_keeps_defaults() {
        let mut store = MockRecordStore::new();
        store.expect_find_one().times(1).returning(|_, _| Ok(None));
        let (channel, _) = build::<PersonalInfoSchema>(store, signed_in());

        channel.load().await;
        assert!(!channel.is_loading());
        assert_eq!(channel.snapshot().await, PersonalInfo::default());
    }

    #[tokio::test]
    async fn load_absorbs_a_decode_failure() {
        let mut store = MockRecordStore::new();
        store
            .expect_find_one()
            .times(1)
            .returning(|_, _| Ok(Some(json!({"id": 9, "age": "young"}))));
        let (channel, _) = build::<PersonalInfoSchema>(store, signed_in());

        channel.load().await;
        assert!(!channel.is_loading());
        assert_eq!(channel.snapshot().await, PersonalInfo::default());
    }

    #[tokio::test]
    async fn load_without_user_makes_no_remote_call() {
        let mut store = MockRecordStore::new();
        store.expect_find_one().never();
        let (channel, _) = build::<PersonalInfoSchema>(store, SessionIdentity::signed_out());

        channel.load().await;
        assert!(!channel.is_loading());
    }

    #[tokio::test]
    async fn add_reading_rejects_an_undeclared_metric() {
        let mut store = MockRecordStore::new();
        store.expect_find_one().never();
        store.expect_insert().never();
        store.expect_update().never();
        let (channel, notifier) = build::<MetricsSchema>(store, signed_in());

        assert!(!channel.add_reading("cholesterol", date(2024, 3, 1), 180.0).await);

        let document = channel.snapshot().await;
        assert!(document
            .metrics
            .values()
            .all(|metric| metric.readings.is_empty()));
        assert_eq!(notifier.severities(), vec![Severity::Error]);
    }

    #[tokio::test]
    async fn add_reading_persists_the_document_as_text() {
        let mut store = MockRecordStore::new();
        store.expect_find_one().times(1).returning(|_, _| Ok(None));
        store
            .expect_insert()
            .withf(|table, row| {
                table == tables::METRICS
                    && row["metrics"].is_string()
                    && row["user_id"] == json!("user-1")
            })
            .times(1)
            .returning(|_, row| {
                let mut stored = row;
                stored["id"] = json!(7);
                Ok(stored)
            });
        let (channel, notifier) = build::<MetricsSchema>(store, signed_in());

        assert!(channel.add_reading("heart_rate", date(2024, 3, 1), 72.0).await);

        let document = channel.snapshot().await;
        assert_eq!(document.id, Some(7));
        let readings = &document.metrics["heart_rate"].readings;
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 72.0);
        assert!(readings[0].id.starts_with("heart_rate"));
        assert_eq!(notifier.severities(), vec![Severity::Success]);
    }

    #[tokio::test]
    async fn lab_add_captures_id_and_keeps_written_status() {
        let mut store = MockRecordStore::new();
        store
            .expect_insert()
            .withf(|table, row| {
                table == tables::LAB_REPORTS
                    && row.get("id").is_none()
                    && row["user_id"] == json!("user-1")
                    && row["status"] == json!("abnormal")
                    && row["testresults"].is_string()
            })
            .times(1)
            .returning(|_, row| {
                let mut stored = row;
                stored["id"] = json!(31);
                Ok(stored)
            });
        let (channel, notifier) = build_lab(store, signed_in());

        let report = LabReport {
            id: None,
            user_id: None,
            name: "Lipid panel".into(),
            date: date(2024, 2, 10),
            status: LabStatus::Abnormal,
            fileurl: None,
            results: Some(vec![LabTestResult {
                id: 1,
                report_id: 0,
                test_name: "LDL".into(),
                value: "162".into(),
                unit: "mg/dL".into(),
                normal_range: Some("< 100".into()),
                is_abnormal: true,
                lab_code: None,
            }]),
        };
        assert!(channel.add(report).await);

        let reports = channel.snapshot().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, Some(31));
        assert_eq!(reports[0].status, LabStatus::Abnormal);
        assert_eq!(notifier.severities(), vec![Severity::Success]);
    }

    #[tokio::test]
    async fn lab_delete_removes_exactly_one_entry() {
        let mut store = MockRecordStore::new();
        store.expect_find_all().times(1).returning(|_, _| {
            Ok(vec![
                json!({"id": 1, "user_id": "user-1", "name": "CBC", "date": "2024-01-05", "status": "normal"}),
                json!({"id": 2, "user_id": "user-1", "name": "CBC", "date": "2024-02-05", "status": "pending"}),
            ])
        });
        store
            .expect_delete()
            .with(eq(tables::LAB_REPORTS), eq(1i64), eq("user-1"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let (channel, _) = build_lab(store, signed_in());

        channel.load().await;
        assert!(channel.delete(1).await);

        let reports = channel.snapshot().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, Some(2));
    }

    #[tokio::test]
    async fn lab_delete_failure_keeps_the_cache() {
        let mut store = MockRecordStore::new();
        store.expect_find_all().times(1).returning(|_, _| {
            Ok(vec![json!({
                "id": 5, "user_id": "user-1", "name": "CBC",
                "date": "2024-01-05", "status": "normal"
            })])
        });
        store
            .expect_delete()
            .times(1)
            .returning(|_, _, _| Err(StoreError::NotFound));
        let (channel, notifier) = build_lab(store, signed_in());

        channel.load().await;
        assert!(!channel.delete(5).await);
        assert_eq!(channel.snapshot().await.len(), 1);
        assert_eq!(notifier.severities(), vec![Severity::Error]);
    }

    #[tokio::test]
    async fn lab_load_skips_undecodable_rows_and_normalizes_status() {
        let mut store = MockRecordStore::new();
        store.expect_find_all().times(1).returning(|_, _| {
            Ok(vec![
                json!({"id": 1, "user_id": "user-1", "name": "CBC", "date": "2024-01-05", "status": "Completed"}),
                json!({"id": 2, "user_id": "user-1", "name": "broken", "date": "not-a-date", "status": "normal"}),
            ])
        });
        let (channel, _) = build_lab(store, signed_in());

        channel.load().await;
        assert!(!channel.is_loading());

        let reports = channel.snapshot().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, LabStatus::Pending);
    }

    #[tokio::test]
    async fn lab_writes_require_a_signed_in_user() {
        let mut store = MockRecordStore::new();
        store.expect_find_all().never();
        store.expect_insert().never();
        store.expect_delete().never();
        let (channel, notifier) = build_lab(store, SessionIdentity::signed_out());

        let report = LabReport {
            id: None,
            user_id: None,
            name: "CBC".into(),
            date: date(2024, 1, 5),
            status: LabStatus::Pending,
            fileurl: None,
            results: None,
        };
        assert!(!channel.add(report).await);
        assert!(!channel.delete(1).await);
        assert_eq!(notifier.severities(), vec![Severity::Error, Severity::Error]);
    }
}
