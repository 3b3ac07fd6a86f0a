//! HealthSync demo
//!
//! Main entry point: wires a record store, a session identity, and the
//! synchronization engine together, then walks every channel once.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use healthsync::config;
use healthsync::engine::SyncEngine;
use healthsync::identity::SessionIdentity;
use healthsync::models::{LabReport, LabStatus, LifestyleUpdate, PersonalInfoUpdate, VitalsUpdate};
use healthsync::notify::TracingNotifier;
use healthsync::store::{MemoryStore, RecordStore, RestStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment first so configuration overrides can come from a .env file
    dotenv::dotenv().ok();

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = config::load_config().context("failed to load configuration")?;

    // Pick the record store backend
    let store: Arc<dyn RecordStore> = match settings.store.backend.as_str() {
        "rest" => Arc::new(RestStore::new(&settings.store).context("failed to build REST store")?),
        _ => Arc::new(MemoryStore::new()),
    };
    info!(backend = %settings.store.backend, "record store ready");

    // Session identity: restored from configuration or a fresh demo user
    let user_id = settings
        .session
        .user_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    info!(%user_id, "starting session");
    let identity = Arc::new(SessionIdentity::new(Some(user_id)));

    // Build the engine and load every channel
    let engine = SyncEngine::new(store, identity, Arc::new(TracingNotifier));
    engine.load_all().await;

    // Walk the channels once so a fresh store ends up with one row each
    engine
        .personal_info
        .upsert(PersonalInfoUpdate {
            full_name: Some("Demo User".into()),
            age: Some(34),
            ..Default::default()
        })
        .await;
    engine
        .vitals
        .upsert(VitalsUpdate {
            height: Some(172.0),
            weight: Some(70.5),
            ..Default::default()
        })
        .await;
    engine
        .lifestyle
        .upsert(LifestyleUpdate {
            activity_level: Some("moderate".into()),
            ..Default::default()
        })
        .await;
    engine
        .metrics
        .add_reading("heart_rate", chrono::Utc::now().date_naive(), 72.0)
        .await;
    engine
        .lab_reports
        .add(LabReport {
            id: None,
            user_id: None,
            name: "Complete blood count".into(),
            date: chrono::Utc::now().date_naive(),
            status: LabStatus::Pending,
            fileurl: None,
            results: None,
        })
        .await;

    // Print the synchronized state
    let personal = engine.personal_info.snapshot().await;
    println!("personal info: {}", serde_json::to_string_pretty(&personal)?);
    let vitals = engine.vitals.snapshot().await;
    println!("vitals: {}", serde_json::to_string_pretty(&vitals)?);
    let lifestyle = engine.lifestyle.snapshot().await;
    println!("lifestyle: {}", serde_json::to_string_pretty(&lifestyle)?);

    let metrics = engine.metrics.snapshot().await;
    for (key, metric) in &metrics.metrics {
        info!(metric = %key, unit = %metric.unit, readings = metric.readings.len(), "tracked metric");
    }
    for report in engine.lab_reports.snapshot().await {
        info!(name = %report.name, status = %report.status, "lab report");
    }

    Ok(())
}
