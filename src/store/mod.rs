//! Remote record store interface.
//!
//! The durable owner of record data is a remote row store reached through
//! [`RecordStore`]. Rows travel as raw JSON values; typed validation happens
//! at the channel boundary so no shape assumption leaks past decode.
//! "Row not found" is an empty-state signal, not an error, and is therefore
//! modeled as `Ok(None)` on reads and kept distinguishable from transport
//! failures everywhere else.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Remote table names, one per record channel.
pub mod tables {
    pub const PERSONAL_INFO: &str = "personal_info";
    pub const VITALS: &str = "vitals_info";
    pub const LIFESTYLE: &str = "lifestyle_info";
    pub const METRICS: &str = "metrics_info";
    pub const LAB_REPORTS: &str = "lab_reports";
}

/// Failures reported by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed row does not exist (update/delete targets only; reads
    /// report absence as `None`).
    #[error("row not found")]
    NotFound,

    /// The store rejected the caller's credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The request never produced a usable response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("store api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The store answered with a body this client cannot interpret.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// Per-row CRUD against the remote store.
///
/// All single-row channels key their row by `user_id`; the lab report
/// collection additionally addresses rows by the store-assigned `id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the single row owned by `user_id`, if one exists.
    async fn find_one(&self, table: &str, user_id: &str) -> Result<Option<Value>, StoreError>;

    /// Fetch every row owned by `user_id` (collection channels).
    async fn find_all(&self, table: &str, user_id: &str) -> Result<Vec<Value>, StoreError>;

    /// Insert a new row and return it as persisted (including the
    /// store-assigned `id`).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Update the row addressed by `row_id` with the given fields and
    /// return it as persisted.
    async fn update(&self, table: &str, row_id: i64, fields: Value) -> Result<Value, StoreError>;

    /// Delete the row addressed by `row_id`, scoped to `user_id`. Fails
    /// with [`StoreError::NotFound`] when no row matches both.
    async fn delete(&self, table: &str, row_id: i64, user_id: &str) -> Result<(), StoreError>;
}
