//! In-process store used by tests and the offline demo path.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{RecordStore, StoreError};

/// A [`RecordStore`] holding rows in memory, with store-assigned `i64` ids.
///
/// Semantics mirror the remote row store: reads filter by `user_id`,
/// updates shallow-merge fields onto the addressed row, deletes require
/// both the row id and the owning user id to match.
#[derive(Default)]
pub struct MemoryStore {
    tables: DashMap<String, Vec<Value>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_matches(row: &Value, user_id: &str) -> bool {
        row.get("user_id").and_then(Value::as_str) == Some(user_id)
    }

    fn id_matches(row: &Value, row_id: i64) -> bool {
        row.get("id").and_then(Value::as_i64) == Some(row_id)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_one(&self, table: &str, user_id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.tables.get(table).and_then(|rows| {
            rows.iter()
                .find(|row| Self::owner_matches(row, user_id))
                .cloned()
        }))
    }

    async fn find_all(&self, table: &str, user_id: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| Self::owner_matches(row, user_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let mut row = row;
        let fields = row
            .as_object_mut()
            .ok_or_else(|| StoreError::Malformed("insert payload must be an object".into()))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        fields.insert("id".into(), Value::from(id));
        let stored = row.clone();
        self.tables.entry(table.to_string()).or_default().push(row);
        Ok(stored)
    }

    async fn update(&self, table: &str, row_id: i64, fields: Value) -> Result<Value, StoreError> {
        let patch = fields
            .as_object()
            .ok_or_else(|| StoreError::Malformed("update payload must be an object".into()))?
            .clone();
        let mut rows = self.tables.get_mut(table).ok_or(StoreError::NotFound)?;
        let row = rows
            .iter_mut()
            .find(|row| Self::id_matches(row, row_id))
            .ok_or(StoreError::NotFound)?;
        let target = row
            .as_object_mut()
            .ok_or_else(|| StoreError::Malformed("stored row is not an object".into()))?;
        for (key, value) in patch {
            target.insert(key, value);
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, row_id: i64, user_id: &str) -> Result<(), StoreError> {
        let mut rows = self.tables.get_mut(table).ok_or(StoreError::NotFound)?;
        let index = rows
            .iter()
            .position(|row| Self::id_matches(row, row_id) && Self::owner_matches(row, user_id))
            .ok_or(StoreError::NotFound)?;
        rows.remove(index);
        Ok(())
    }
}
