//! Alert monitor: the single timeline that owns the display state.
//!
//! The monitor runs fetch cycles on a fixed period and on demand, applies
//! manual resolutions, and dispatches notifications.
//!
//! # Concurrency
//!
//! - At most one fetch cycle is in flight. A trigger that arrives while one is
//!   running is skipped, not queued.
//! - The merge is applied under the state write lock, together with the
//!   snapshot of previously shown ids. Readers see the state before or after a
//!   merge, never in between. Resolutions take the same lock, so they
//!   interleave between merges but never inside one.
//! - Teardown bumps a generation counter. A cycle that started under an older
//!   generation discards its result instead of applying it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::controller::FallbackController;
use crate::error::ValidationError;
use crate::model::{AlertId, DisplayState, FarmContext, FetchOutcome, NotificationPreferences};
use crate::notify::{Notifier, decide_notifications};
use crate::reconcile::{reconcile, resolve};

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// What the monitor currently shows.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub display: DisplayState,

    /// Outcome of the most recent applied cycle.
    pub last_outcome: Option<FetchOutcome>,

    pub last_refreshed: Option<DateTime<Utc>>,

    /// Whether any cycle has ever produced data, live or cached.
    pub data_available: bool,
}

impl MonitorState {
    /// Failed with nothing to show, as opposed to zero alerts.
    pub fn is_unavailable(&self) -> bool {
        !self.data_available && self.last_outcome == Some(FetchOutcome::Failed)
    }
}

/// Result of asking the monitor to run a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleReport {
    /// The cycle ran and its result was applied.
    Completed {
        outcome: FetchOutcome,
        notified: usize,
    },
    /// Another cycle was already in flight.
    Skipped,
    /// The monitor was torn down; the result, if any, was dropped.
    Discarded,
}

impl CycleReport {
    pub fn label(&self) -> &'static str {
        match self {
            CycleReport::Completed { .. } => "completed",
            CycleReport::Skipped => "skipped",
            CycleReport::Discarded => "discarded",
        }
    }

    pub fn outcome(&self) -> Option<FetchOutcome> {
        match self {
            CycleReport::Completed { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }
}

struct Inner {
    controller: FallbackController,
    context: FarmContext,
    preferences: NotificationPreferences,
    notifier: Arc<dyn Notifier>,
    state: RwLock<MonitorState>,
    in_flight: AtomicBool,
    generation: AtomicU64,
    shutdown: watch::Sender<bool>,
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to the alert monitor. Cheap to clone.
#[derive(Clone)]
pub struct AlertMonitor {
    inner: Arc<Inner>,
}

impl AlertMonitor {
    pub fn new(
        controller: FallbackController,
        context: FarmContext,
        preferences: NotificationPreferences,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                controller,
                context,
                preferences,
                notifier,
                state: RwLock::new(MonitorState::default()),
                in_flight: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                shutdown,
            }),
        }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> MonitorState {
        self.inner.state.read().await.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Run one fetch cycle now, unless one is already running.
    pub async fn refresh(&self) -> Result<CycleReport, ValidationError> {
        if self.is_shut_down() {
            return Ok(CycleReport::Discarded);
        }

        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Fetch cycle already in flight, skipping");
            return Ok(CycleReport::Skipped);
        }
        let _guard = InFlightGuard(&self.inner.in_flight);

        let generation = self.inner.generation.load(Ordering::Acquire);
        let fetched = self.inner.controller.fetch_batch(&self.inner.context).await?;
        let outcome = fetched.outcome();

        let notifications = {
            let mut state = self.inner.state.write().await;

            if self.inner.generation.load(Ordering::Acquire) != generation {
                info!(
                    outcome = outcome.label(),
                    "Discarding fetch result that completed after teardown"
                );
                return Ok(CycleReport::Discarded);
            }

            let previous_ids = state.display.ids();
            if let Some(batch) = fetched.batch() {
                state.display = reconcile(&state.display, batch);
                state.data_available = true;
            }
            state.last_outcome = Some(outcome);
            state.last_refreshed = Some(Utc::now());

            info!(
                outcome = outcome.label(),
                alert_count = state.display.len(),
                "Alert cycle applied"
            );

            // Cached batches are stale and never notify.
            if outcome == FetchOutcome::Success {
                decide_notifications(&previous_ids, &state.display, &self.inner.preferences)
            } else {
                Vec::new()
            }
        };

        for alert in &notifications {
            if let Err(e) = self.inner.notifier.notify(alert).await {
                warn!(id = %alert.id, error = %e, "Failed to deliver notification");
            }
        }

        Ok(CycleReport::Completed {
            outcome,
            notified: notifications.len(),
        })
    }

    /// Mark an alert Resolved. Returns whether the id was on display.
    pub async fn resolve(&self, id: &AlertId) -> bool {
        let mut state = self.inner.state.write().await;
        let found = state.display.contains(id);
        if found {
            state.display = resolve(&state.display, id);
            info!(id = %id, "Alert resolved");
        } else {
            debug!(id = %id, "Resolve requested for an alert not on display");
        }
        found
    }

    /// Start polling every `interval`. The first cycle runs immediately.
    ///
    /// Each tick runs its cycle on a separate task so a slow fetch never
    /// delays the timer; overlapping ticks are skipped by the in-flight check.
    pub fn spawn(&self, interval: Duration) -> JoinHandle<()> {
        let monitor = self.clone();
        let mut shutdown = self.inner.shutdown.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            if monitor.is_shut_down() {
                return;
            }

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let monitor = monitor.clone();
                        tokio::spawn(async move {
                            if let Err(e) = monitor.refresh().await {
                                warn!(error = %e, "Skipping alert cycle: invalid farm context");
                            }
                        });
                    }
                }
            }

            debug!("Alert polling stopped");
        })
    }

    /// Stop polling and drop the results of any cycle still in flight.
    pub fn shutdown(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.shutdown.send_replace(true);
        info!("Alert monitor shut down");
    }
}
