//! Merging fetched alert batches into the display state.
//!
//! Everything here is pure: no I/O, no clocks. The controller and monitor
//! decide when to call it and what to do with the result.
//!
//! # Merge rules
//!
//! - Known ids take every field from the incoming alert, except that a
//!   locally Resolved alert stays Resolved when the source still reports it
//!   Active.
//! - Ids missing from the incoming batch are kept unchanged. Disappearing from
//!   a feed is not proof of resolution.
//! - Novel ids are appended in incoming order.
//! - The result is stably partitioned: Active first, then Resolved.

use std::collections::HashMap;

use crate::model::{Alert, AlertBatch, AlertId, AlertStatus, DisplayState};

/// Merge `incoming` into `current`, producing the next display state.
pub fn reconcile(current: &DisplayState, incoming: &AlertBatch) -> DisplayState {
    reconcile_alerts(current, &incoming.alerts)
}

/// Same as [`reconcile`], over a bare alert list.
///
/// When `incoming` repeats an id, the last occurrence wins.
pub fn reconcile_alerts(current: &DisplayState, incoming: &[Alert]) -> DisplayState {
    let latest = latest_by_id(incoming);
    let updates: HashMap<&AlertId, &Alert> = latest.iter().map(|a| (&a.id, *a)).collect();

    let mut merged = Vec::with_capacity(current.len() + latest.len());

    for existing in current.alerts() {
        match updates.get(&existing.id) {
            Some(update) => merged.push(merge_known(existing, update)),
            None => merged.push(existing.clone()),
        }
    }

    merged.extend(
        latest
            .into_iter()
            .filter(|alert| !current.contains(&alert.id))
            .cloned(),
    );

    DisplayState::from_ordered(merged)
}

/// Mark the alert with `id` as Resolved.
///
/// An unknown id leaves the state as it is; a concurrent cycle may already
/// have changed it.
pub fn resolve(state: &DisplayState, id: &AlertId) -> DisplayState {
    let alerts = state
        .alerts()
        .iter()
        .map(|alert| {
            if &alert.id == id {
                Alert {
                    status: AlertStatus::Resolved,
                    ..alert.clone()
                }
            } else {
                alert.clone()
            }
        })
        .collect();

    DisplayState::from_ordered(alerts)
}

/// Source wins on every field except a stale Active over a local Resolved.
fn merge_known(existing: &Alert, update: &Alert) -> Alert {
    let status = match (existing.status, update.status) {
        (AlertStatus::Resolved, AlertStatus::Active) => AlertStatus::Resolved,
        (_, incoming) => incoming,
    };

    Alert {
        status,
        ..update.clone()
    }
}

/// Deduplicate by id keeping the last occurrence, in order of those
/// occurrences.
fn latest_by_id(alerts: &[Alert]) -> Vec<&Alert> {
    let mut last_index: HashMap<&AlertId, usize> = HashMap::with_capacity(alerts.len());
    for (i, alert) in alerts.iter().enumerate() {
        last_index.insert(&alert.id, i);
    }

    alerts
        .iter()
        .enumerate()
        .filter(|(i, alert)| last_index.get(&alert.id) == Some(i))
        .map(|(_, alert)| alert)
        .collect()
}
