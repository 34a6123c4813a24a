//! Client for the hosted alert generator.
//!
//! The generator produces a list of system alerts for a farm from its
//! location, crop and farm type. Its output is machine-generated, so every
//! response is checked before it is allowed into the engine.
//!
//! # API
//!
//! `GET {base}/alerts/generate?city=..&state=..&cropName=..&farmType=..`
//!
//! ```json
//! {
//!     "alerts": [
//!         {
//!             "severity": "High",
//!             "component": "Nutrient Tank A",
//!             "message": "pH level above 6.5",
//!             "timestamp": "5m ago",
//!             "status": "Active"
//!         }
//!     ]
//! }
//! ```
//!
//! `id` is optional per alert; see [`IdStrategy`].

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::AlertSource;
use crate::error::FetchError;
use crate::model::{AlertBatch, FarmContext, IdStrategy, RawAlert};

/// Default base URL for a locally running generator.
pub const DEFAULT_GENERATOR_URL: &str = "http://127.0.0.1:9002";

/// HTTP client for the alert generator.
#[derive(Clone)]
pub struct GeneratorClient {
    client: reqwest::Client,
    base_url: String,
    id_strategy: IdStrategy,
}

impl Default for GeneratorClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorClient {
    /// Create a client for the default local generator.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_GENERATOR_URL)
    }

    /// Create a client for a generator at `base_url`.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            id_strategy: IdStrategy::default(),
        }
    }

    /// Choose how alert ids are assigned.
    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }

    fn generate_url(&self, context: &FarmContext) -> String {
        format!(
            "{}/alerts/generate?city={}&state={}&cropName={}&farmType={}",
            self.base_url,
            urlencoding::encode(&context.city),
            urlencoding::encode(&context.state),
            urlencoding::encode(&context.crop_name),
            urlencoding::encode(&context.farm_type),
        )
    }
}

#[async_trait]
impl AlertSource for GeneratorClient {
    async fn fetch_alerts(&self, context: &FarmContext) -> Result<AlertBatch, FetchError> {
        let url = self.generate_url(context);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let generated: GeneratedAlerts = serde_json::from_slice(&body)
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;
        generated.check()?;

        let alerts = generated
            .alerts
            .into_iter()
            .map(|raw| raw.into_alert(self.id_strategy))
            .collect();

        Ok(AlertBatch {
            alerts,
            fetched_at: Utc::now(),
            context: context.clone(),
        })
    }

    fn name(&self) -> &str {
        "generator"
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Response body of the generate endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedAlerts {
    pub alerts: Vec<RawAlert>,
}

impl GeneratedAlerts {
    /// Reject alerts the engine cannot display meaningfully.
    fn check(&self) -> Result<(), FetchError> {
        for (i, alert) in self.alerts.iter().enumerate() {
            if alert.component.trim().is_empty() {
                return Err(FetchError::InvalidResponse(format!(
                    "alert {i} has an empty component"
                )));
            }
            if alert.message.trim().is_empty() {
                return Err(FetchError::InvalidResponse(format!(
                    "alert {i} has an empty message"
                )));
            }
        }
        Ok(())
    }
}
