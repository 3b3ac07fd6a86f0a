//! Synchronization engine: the five record channels behind one facade.
//!
//! The engine wires every channel to the same store, identity provider, and
//! notifier, loads them together, and watches the session lifecycle so each
//! sign-in triggers exactly one load.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::channels::{
    LabReportsChannel, LifestyleChannel, MetricsChannel, PersonalInfoChannel, VitalsChannel,
};
use crate::identity::IdentityProvider;
use crate::notify::Notifier;
use crate::store::RecordStore;

/// Owns one channel per record type and coordinates shared lifecycle work.
pub struct SyncEngine {
    pub personal_info: PersonalInfoChannel,
    pub vitals: VitalsChannel,
    pub lifestyle: LifestyleChannel,
    pub metrics: MetricsChannel,
    pub lab_reports: LabReportsChannel,
    identity: Arc<dyn IdentityProvider>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            personal_info: PersonalInfoChannel::new(
                store.clone(),
                identity.clone(),
                notifier.clone(),
            ),
            vitals: VitalsChannel::new(store.clone(), identity.clone(), notifier.clone()),
            lifestyle: LifestyleChannel::new(store.clone(), identity.clone(), notifier.clone()),
            metrics: MetricsChannel::new(store.clone(), identity.clone(), notifier.clone()),
            lab_reports: LabReportsChannel::new(store, identity.clone(), notifier),
            identity,
        }
    }

    /// Load every channel concurrently.
    #[instrument(skip(self))]
    pub async fn load_all(&self) {
        futures::join!(
            self.personal_info.load(),
            self.vitals.load(),
            self.lifestyle.load(),
            self.metrics.load(),
            self.lab_reports.load(),
        );
        info!("all channels loaded");
    }

    /// True while any channel is still on its first load.
    pub fn is_loading(&self) -> bool {
        self.personal_info.is_loading()
            || self.vitals.is_loading()
            || self.lifestyle.is_loading()
            || self.metrics.is_loading()
            || self.lab_reports.is_loading()
    }

    /// Drive loads from the session lifecycle.
    ///
    /// The state observed at startup counts as the first transition: a
    /// restored session loads its records, an absent one just clears the
    /// loading flags. After that, each signed-out to signed-in edge loads
    /// exactly once. Never returns; spawn it alongside the embedding
    /// application's event loop.
    pub async fn watch_identity(&self) {
        let mut rx = self.identity.subscribe();
        let mut signed_in = self.identity.current().is_some();
        self.load_all().await;

        while rx.changed().await.is_ok() {
            let now_signed_in = rx.borrow_and_update().is_some();
            if now_signed_in && !signed_in {
                info!("user signed in, loading records");
                self.load_all().await;
            }
            signed_in = now_signed_in;
        }
    }
}
