//! Error types for the record synchronization layer.
//!
//! Every fallible operation in this crate returns one of these types; there
//! is no panic path. Loader errors are absorbed by the caller, coordinator
//! errors surface as a failed write plus a notification.

use thiserror::Error;

use crate::store::StoreError;

/// Errors produced while decoding a remote payload into a typed record.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload was not valid JSON, or valid JSON of the wrong shape.
    #[error("malformed {context} payload: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The payload parsed but was not the expected container kind.
    #[error("unexpected {context} shape: expected {expected}")]
    Shape {
        context: &'static str,
        expected: &'static str,
    },
}

impl DecodeError {
    pub fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub fn shape(context: &'static str, expected: &'static str) -> Self {
        Self::Shape { context, expected }
    }
}

/// Errors surfaced by channel operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No active user identity at call time. Checked before any remote call.
    #[error("authentication required")]
    NotAuthenticated,

    /// The pre-write existence check failed with something other than
    /// "no row found".
    #[error("existence check failed for {table}: {source}")]
    ExistenceCheckFailed {
        table: &'static str,
        #[source]
        source: StoreError,
    },

    /// A remote read failed with something other than "no row found".
    #[error("read failed for {table}: {source}")]
    ReadFailed {
        table: &'static str,
        #[source]
        source: StoreError,
    },

    /// A remote insert, update, or delete failed.
    #[error("write failed for {table}: {source}")]
    WriteFailed {
        table: &'static str,
        #[source]
        source: StoreError,
    },

    /// A semi-structured payload from the store could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The caller referenced a metric key that is not part of the document.
    #[error("unknown metric key: {0}")]
    MetricNotFound(String),
}

impl SyncError {
    pub fn existence_check(table: &'static str, source: StoreError) -> Self {
        Self::ExistenceCheckFailed { table, source }
    }

    pub fn read(table: &'static str, source: StoreError) -> Self {
        Self::ReadFailed { table, source }
    }

    pub fn write(table: &'static str, source: StoreError) -> Self {
        Self::WriteFailed { table, source }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;
