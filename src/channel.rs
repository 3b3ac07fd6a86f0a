//! Generic single-row record channel.
//!
//! Personal info, vitals, lifestyle, and metrics all follow the same
//! pattern: one remote row per user, a locally cached copy initialized to a
//! default, and writes that decide between insert and update by user
//! identity. [`SingleRowChannel`] implements that pattern once; each channel
//! supplies its schema through [`ChannelSchema`].
//!
//! Failure policy: loads are absorbed (stale cache beats a crashed UI),
//! writes surface as a boolean plus a notification. The cache is replaced
//! only after the remote call succeeds, so readers never observe a partial
//! merge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::error::{DecodeError, Result, SyncError};
use crate::identity::IdentityProvider;
use crate::notify::{Notification, Notifier};
use crate::store::{RecordStore, StoreError};

/// Per-channel schema: the record type, its partial-update type, and the
/// row representation used on the wire.
pub trait ChannelSchema: Send + Sync + 'static {
    type Record: Clone + Default + PartialEq + std::fmt::Debug + Send + Sync;
    type Update: Send;

    /// Remote table this channel persists to.
    const TABLE: &'static str;
    /// Channel name used in user-facing notifications.
    const LABEL: &'static str;

    /// Shallow-merge the update onto the record: only supplied fields move.
    fn apply_update(record: &mut Self::Record, update: Self::Update);

    /// Validate and decode a fetched row.
    fn decode(row: Value) -> std::result::Result<Self::Record, DecodeError>;

    /// Serialize the record into its row representation.
    fn encode(record: &Self::Record) -> std::result::Result<Value, DecodeError>;

    /// The store-assigned row id, once known.
    fn row_id(record: &Self::Record) -> Option<i64>;

    /// Stamp the persisted identity onto the record after a write.
    fn set_row_identity(record: &mut Self::Record, id: Option<i64>, user_id: &str);
}

/// Cache, loader, and upsert coordinator for one single-row channel.
pub struct SingleRowChannel<S: ChannelSchema> {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    cache: RwLock<S::Record>,
    loading: AtomicBool,
    write_gate: Mutex<()>,
}

impl<S: ChannelSchema> SingleRowChannel<S> {
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
            cache: RwLock::new(S::Record::default()),
            loading: AtomicBool::new(true),
            write_gate: Mutex::new(()),
        }
    }

    /// Current cached record.
    pub async fn snapshot(&self) -> S::Record {
        self.cache.read().await.clone()
    }

    /// True until the first load attempt completes.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub(crate) fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Fetch the user's row and populate the cache.
    ///
    /// Absence of a row leaves the default in place; read and decode
    /// failures are logged and absorbed. The loading flag clears on every
    /// path, including when no user is signed in.
    #[instrument(skip(self), fields(table = S::TABLE))]
    pub async fn load(&self) {
        let Some(user_id) = self.identity.current() else {
            self.loading.store(false, Ordering::SeqCst);
            return;
        };
        match self.try_load(&user_id).await {
            Ok(Some(record)) => {
                *self.cache.write().await = record;
                debug!(table = S::TABLE, "cache populated from remote row");
            }
            Ok(None) => debug!(table = S::TABLE, "no remote row yet"),
            Err(err) => warn!(table = S::TABLE, %err, "load absorbed, cache keeps prior value"),
        }
        self.loading.store(false, Ordering::SeqCst);
    }

    async fn try_load(&self, user_id: &str) -> Result<Option<S::Record>> {
        let row = self
            .store
            .find_one(S::TABLE, user_id)
            .await
            .map_err(|source| SyncError::read(S::TABLE, source))?;
        match row {
            Some(row) => Ok(Some(S::decode(row)?)),
            None => Ok(None),
        }
    }

    /// Merge the update, persist it, and commit it to the cache.
    ///
    /// Returns `true` on success. Both outcomes emit a notification.
    pub async fn upsert(&self, update: S::Update) -> bool {
        match self.try_upsert(update).await {
            Ok(()) => {
                self.notifier
                    .notify(Notification::success(S::LABEL, "Your changes have been saved"));
                true
            }
            Err(err) => {
                warn!(table = S::TABLE, %err, "upsert failed");
                self.notifier
                    .notify(Notification::failure(S::LABEL, err.to_string()));
                false
            }
        }
    }

    #[instrument(skip(self, update), fields(table = S::TABLE))]
    pub(crate) async fn try_upsert(&self, update: S::Update) -> Result<()> {
        let user_id = self.identity.current().ok_or(SyncError::NotAuthenticated)?;

        // Writes for one channel are serialized: the existence check and the
        // write it decides must not interleave with another writer's.
        let _gate = self.write_gate.lock().await;

        let mut merged = self.cache.read().await.clone();
        S::apply_update(&mut merged, update);

        let existing = self
            .store
            .find_one(S::TABLE, &user_id)
            .await
            .map_err(|source| SyncError::existence_check(S::TABLE, source))?;

        let mut fields = writable_fields::<S>(S::encode(&merged)?)?;
        let stored = match existing {
            Some(row) => {
                let row_id = row.get("id").and_then(Value::as_i64).ok_or_else(|| {
                    SyncError::existence_check(
                        S::TABLE,
                        StoreError::Malformed("existing row carries no id".into()),
                    )
                })?;
                self.store
                    .update(S::TABLE, row_id, Value::Object(fields))
                    .await
                    .map_err(|source| SyncError::write(S::TABLE, source))?
            }
            None => {
                fields.insert("user_id".into(), Value::String(user_id.clone()));
                self.store
                    .insert(S::TABLE, Value::Object(fields))
                    .await
                    .map_err(|source| SyncError::write(S::TABLE, source))?
            }
        };

        let row_id = stored
            .get("id")
            .and_then(Value::as_i64)
            .or_else(|| S::row_id(&merged));
        S::set_row_identity(&mut merged, row_id, &user_id);
        *self.cache.write().await = merged;
        info!(table = S::TABLE, "record persisted");
        Ok(())
    }
}

/// Row fields eligible for transmission: the encoded record minus the
/// store-owned `id` column.
fn writable_fields<S: ChannelSchema>(
    row: Value,
) -> std::result::Result<serde_json::Map<String, Value>, DecodeError> {
    match row {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        _ => Err(DecodeError::shape(S::TABLE, "object")),
    }
}
