//! HealthSync core library
//!
//! This module exports the record synchronization layer: per-channel
//! caches, loaders, and upsert coordinators over a pluggable record store.

pub mod channel;
pub mod channels;
pub mod codec;
pub mod engine;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod store;

/// Application configuration
pub mod config {
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Settings {
        pub store: StoreSettings,
        #[serde(default)]
        pub session: SessionSettings,
    }

    /// Backend selection and connection details for the record store.
    #[derive(Debug, Clone, Deserialize)]
    pub struct StoreSettings {
        #[serde(default = "default_backend")]
        pub backend: String,
        #[serde(default)]
        pub base_url: String,
        #[serde(default)]
        pub api_key: String,
        #[serde(default = "default_timeout_secs")]
        pub timeout_secs: u64,
    }

    /// Restored session state for the demo binary, if any.
    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct SessionSettings {
        pub user_id: Option<String>,
    }

    fn default_backend() -> String {
        "memory".into()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    /// Load configuration from file, then environment overrides
    pub fn load_config() -> Result<Settings, config::ConfigError> {
        let env = std::env::var("HEALTHSYNC_ENV").unwrap_or_else(|_| "development".into());
        config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(config::Environment::with_prefix("HEALTHSYNC").separator("__"))
            .build()?
            .try_deserialize()
    }
}
