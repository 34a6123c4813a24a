//! Fetch with cache fallback.
//!
//! One fetch cycle asks the source for a fresh batch within a latency bound.
//! A fresh batch is written to the single-slot cache and merged. Any fetch
//! failure, including a timeout, falls back to the cached batch. With nothing
//! cached, the current state is returned unchanged and the outcome is
//! [`FetchOutcome::Failed`].
//!
//! Only a [`ValidationError`] escapes, and it does so before any fetch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::data_sources::AlertSource;
use crate::error::{FetchError, ValidationError};
use crate::model::{AlertBatch, DisplayState, FarmContext, FetchOutcome};
use crate::reconcile::reconcile;
use crate::storage::{KeyValueStore, load_batch, store_batch};

/// Default bound on a single fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// The batch a fetch cycle obtained, if any, and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Live(AlertBatch),
    Cached(AlertBatch),
    Unavailable,
}

impl Fetched {
    pub fn outcome(&self) -> FetchOutcome {
        match self {
            Fetched::Live(_) => FetchOutcome::Success,
            Fetched::Cached(_) => FetchOutcome::UsedCache,
            Fetched::Unavailable => FetchOutcome::Failed,
        }
    }

    pub fn batch(&self) -> Option<&AlertBatch> {
        match self {
            Fetched::Live(batch) | Fetched::Cached(batch) => Some(batch),
            Fetched::Unavailable => None,
        }
    }
}

/// Fetches alert batches and falls back to the cache on failure.
#[derive(Clone)]
pub struct FallbackController {
    source: Arc<dyn AlertSource>,
    cache: Arc<dyn KeyValueStore>,
    fetch_timeout: Duration,
}

impl FallbackController {
    pub fn new(source: Arc<dyn AlertSource>, cache: Arc<dyn KeyValueStore>) -> Self {
        Self {
            source,
            cache,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Obtain the batch for this cycle without merging it.
    pub async fn fetch_batch(&self, context: &FarmContext) -> Result<Fetched, ValidationError> {
        context.validate()?;

        let error = match self.fetch_live(context).await {
            Ok(batch) => {
                if let Err(e) = store_batch(self.cache.as_ref(), &batch).await {
                    warn!(error = %e, "Failed to cache alert batch");
                }
                debug!(
                    source = self.source.name(),
                    alert_count = batch.alerts.len(),
                    "Fetched live alert batch"
                );
                return Ok(Fetched::Live(batch));
            }
            Err(e) => e,
        };

        match load_batch(self.cache.as_ref()).await {
            Some(batch) => {
                warn!(
                    source = self.source.name(),
                    error = %error,
                    alert_count = batch.alerts.len(),
                    "Alert fetch failed, using cached batch"
                );
                Ok(Fetched::Cached(batch))
            }
            None => {
                warn!(
                    source = self.source.name(),
                    error = %error,
                    "Alert fetch failed and no cached batch is available"
                );
                Ok(Fetched::Unavailable)
            }
        }
    }

    /// Fetch, fall back if needed, and merge into `current`.
    pub async fn fetch_and_reconcile(
        &self,
        current: &DisplayState,
        context: &FarmContext,
    ) -> Result<(DisplayState, FetchOutcome), ValidationError> {
        let fetched = self.fetch_batch(context).await?;
        let next = match fetched.batch() {
            Some(batch) => reconcile(current, batch),
            None => current.clone(),
        };
        Ok((next, fetched.outcome()))
    }

    async fn fetch_live(&self, context: &FarmContext) -> Result<AlertBatch, FetchError> {
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch_alerts(context)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.fetch_timeout)),
        }
    }
}
