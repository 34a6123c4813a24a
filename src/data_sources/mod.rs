//! Alert sources.
//!
//! A source turns a [`FarmContext`] into an [`AlertBatch`] or fails. The engine
//! never cares how: the bundled [`GeneratorClient`] calls a remote alert
//! generator over HTTP, tests plug in their own implementations.
//!
//! # Data Sources
//!
//! - [`generator`]: HTTP client for the hosted alert generator

pub mod generator;

pub use generator::GeneratorClient;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::model::{AlertBatch, FarmContext};

/// Supplies alert batches for a farm.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Fetch the current alerts for `context`.
    async fn fetch_alerts(&self, context: &FarmContext) -> Result<AlertBatch, FetchError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
