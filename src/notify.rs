//! User-facing outcome notifications.
//!
//! Channels report every write outcome, success or failure, through a
//! [`Notifier`]. The call is fire-and-forget: it is never awaited and never
//! retried, so implementations must not block.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// How prominently the embedding UI should surface a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

/// A write-outcome message for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Success,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

/// Sink for write-outcome notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default sink: emits notifications as tracing events. Used when the
/// embedding application has no UI surface wired up.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success => info!(
                title = %notification.title,
                description = %notification.description,
                "notification"
            ),
            Severity::Error => error!(
                title = %notification.title,
                description = %notification.description,
                "notification"
            ),
        }
    }
}
