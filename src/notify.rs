//! Notification policy and dispatch.
//!
//! [`decide_notifications`] is a pure function of its inputs. The caller
//! snapshots the displayed ids before reconciling so that only alerts new to
//! this cycle can qualify.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::info;

use crate::model::{Alert, AlertId, DisplayState, NotificationPreferences};

/// Alerts in `reconciled` that should notify this cycle.
///
/// An alert qualifies when its id is not in `previous_ids`, it is Active, and
/// the preferences want its severity. Order follows `reconciled`.
pub fn decide_notifications(
    previous_ids: &HashSet<AlertId>,
    reconciled: &DisplayState,
    prefs: &NotificationPreferences,
) -> Vec<Alert> {
    if !prefs.email_enabled {
        return Vec::new();
    }

    reconciled
        .alerts()
        .iter()
        .filter(|alert| !previous_ids.contains(&alert.id))
        .filter(|alert| alert.status.is_active())
        .filter(|alert| prefs.wants(alert.severity))
        .cloned()
        .collect()
}

/// Delivers a notification for a single alert.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> anyhow::Result<()>;
}

/// Simulated email delivery: writes the notification to the log.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    recipient: String,
}

impl LogNotifier {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
        info!(
            id = %alert.id,
            severity = alert.severity.label(),
            component = %alert.component,
            recipient = %self.recipient,
            "Email notification simulated"
        );
        Ok(())
    }
}
