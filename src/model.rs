//! Data models for Cropwatch.
//!
//! Alerts arrive from an external generator as loosely shaped JSON and are
//! normalized here into one internal vocabulary: a single [`Severity`] enum
//! (accepting the `High`/`Medium`/`Low` synonyms), a two-state
//! [`AlertStatus`], and a stable [`AlertId`] that is derived from content when
//! the source does not supply one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of an alert, unique within a [`DisplayState`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from the parts of an alert that identify the condition.
    ///
    /// Severity, status and the display timestamp are excluded: they change
    /// while the underlying condition stays the same. Case and surrounding
    /// whitespace are ignored.
    pub fn derive(component: &str, message: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(component.trim().to_lowercase().as_bytes());
        hasher.update(&[0x1f]);
        hasher.update(message.trim().to_lowercase().as_bytes());
        let hex = hasher.finalize().to_hex();
        Self(format!("alert-{}", &hex[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlertId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Alert severity.
///
/// The generator speaks `High`/`Medium`/`Low`; the dashboard speaks
/// `Critical`/`Warning`/`Info`. Both deserialize into this enum and it always
/// serializes with the dashboard names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(alias = "High", alias = "high", alias = "critical")]
    Critical,
    #[serde(alias = "Medium", alias = "medium", alias = "warning")]
    Warning,
    #[serde(alias = "Low", alias = "low", alias = "info")]
    Info,
}

impl Severity {
    /// Sort rank for display: most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" | "high" => Ok(Severity::Critical),
            "warning" | "medium" => Ok(Severity::Warning),
            "info" | "low" => Ok(Severity::Info),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Lifecycle status of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertStatus {
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "resolved")]
    Resolved,
}

impl AlertStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AlertStatus::Active)
    }
}

/// A single reported condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,

    pub severity: Severity,

    /// Origin label, e.g. "Nutrient Tank A" or "Lighting System - Rack 3".
    pub component: String,

    pub message: String,

    /// Display-only timestamp. Either an absolute instant or a relative string
    /// such as "5m ago"; never used for ordering.
    pub timestamp: String,

    pub status: AlertStatus,
}

/// How ids are assigned to alerts coming off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// Use the source id when present and non-blank, otherwise derive one.
    #[default]
    SourceId,
    /// Always derive from content. For sources that regenerate ids per call.
    ContentHash,
}

impl FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" | "source_id" => Ok(IdStrategy::SourceId),
            "content" | "content_hash" => Ok(IdStrategy::ContentHash),
            other => Err(format!("unknown id strategy '{other}'")),
        }
    }
}

/// An alert as delivered by the generator, before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAlert {
    #[serde(default)]
    pub id: Option<String>,
    pub severity: Severity,
    pub component: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    pub status: AlertStatus,
}

impl RawAlert {
    /// Normalize into an [`Alert`], assigning an id according to `strategy`.
    pub fn into_alert(self, strategy: IdStrategy) -> Alert {
        let source_id = match strategy {
            IdStrategy::SourceId => self
                .id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            IdStrategy::ContentHash => None,
        };
        let id = source_id
            .map(AlertId::new)
            .unwrap_or_else(|| AlertId::derive(&self.component, &self.message));

        Alert {
            id,
            severity: self.severity,
            component: self.component,
            message: self.message,
            timestamp: self.timestamp,
            status: self.status,
        }
    }
}

/// The farm an alert batch was requested for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmContext {
    pub city: String,
    pub state: String,
    pub crop_name: String,
    pub farm_type: String,
}

impl FarmContext {
    /// Check that every field needed to request alerts is present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("city", &self.city),
            ("state", &self.state),
            ("cropName", &self.crop_name),
            ("farmType", &self.farm_type),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(name));
            }
        }
        Ok(())
    }
}

/// One fetch worth of alerts, tagged with when and for whom it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertBatch {
    pub alerts: Vec<Alert>,
    pub fetched_at: DateTime<Utc>,
    pub context: FarmContext,
}

impl AlertBatch {
    pub fn new(context: FarmContext, alerts: Vec<Alert>) -> Self {
        Self {
            alerts,
            fetched_at: Utc::now(),
            context,
        }
    }
}

/// Which alerts the user wants to be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub email_enabled: bool,
    pub notify_on_critical: bool,
    pub notify_on_warning: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_enabled: true,
            notify_on_critical: true,
            notify_on_warning: false,
        }
    }
}

impl NotificationPreferences {
    /// Whether an alert of this severity should notify at all.
    ///
    /// Info alerts never notify.
    pub fn wants(&self, severity: Severity) -> bool {
        self.email_enabled
            && match severity {
                Severity::Critical => self.notify_on_critical,
                Severity::Warning => self.notify_on_warning,
                Severity::Info => false,
            }
    }
}

/// The ordered set of alerts currently shown.
///
/// Invariants: ids are unique, and every Active alert precedes every Resolved
/// alert with relative order otherwise preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    alerts: Vec<Alert>,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from an arbitrary list.
    ///
    /// Duplicate ids keep the last occurrence; order is then stabilized.
    pub fn from_alerts(alerts: Vec<Alert>) -> Self {
        let mut last_index: HashMap<AlertId, usize> = HashMap::with_capacity(alerts.len());
        for (i, alert) in alerts.iter().enumerate() {
            last_index.insert(alert.id.clone(), i);
        }
        let unique = alerts
            .into_iter()
            .enumerate()
            .filter(|(i, alert)| last_index.get(&alert.id) == Some(i))
            .map(|(_, alert)| alert)
            .collect();
        Self::from_ordered(unique)
    }

    /// Build a state from alerts with already unique ids, applying the
    /// Active-before-Resolved ordering.
    pub(crate) fn from_ordered(alerts: Vec<Alert>) -> Self {
        let (mut active, resolved): (Vec<_>, Vec<_>) =
            alerts.into_iter().partition(|a| a.status.is_active());
        active.extend(resolved);
        Self { alerts: active }
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn get(&self, id: &AlertId) -> Option<&Alert> {
        self.alerts.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &AlertId) -> bool {
        self.get(id).is_some()
    }

    /// Snapshot of the ids currently shown.
    pub fn ids(&self) -> HashSet<AlertId> {
        self.alerts.iter().map(|a| a.id.clone()).collect()
    }
}

/// Result tag of one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Fresh data from the source was merged.
    Success,
    /// The source failed; the last cached batch was merged instead.
    UsedCache,
    /// The source failed and nothing was cached. State is unchanged.
    Failed,
}

impl FetchOutcome {
    /// Whether the merged data should be flagged as stale.
    pub fn is_stale(&self) -> bool {
        matches!(self, FetchOutcome::UsedCache)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Success => "success",
            FetchOutcome::UsedCache => "used_cache",
            FetchOutcome::Failed => "failed",
        }
    }
}

/// Query parameters for GET /alerts.
#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    /// `all`, `active` (default) or `resolved`.
    pub status: Option<String>,

    /// Any severity name or synonym. Omit for all severities.
    pub severity: Option<String>,
}

/// Response for GET /alerts.
#[derive(Debug, Clone, Serialize)]
pub struct AlertsResponse {
    /// Alerts matching the filter, most urgent first.
    pub alerts: Vec<Alert>,

    /// Counts over the whole display state, not just the filtered view.
    pub summary: crate::view::AlertSummary,

    /// Outcome of the most recent fetch cycle, if one has run.
    pub outcome: Option<FetchOutcome>,

    /// True when the shown data came from the cache.
    pub stale: bool,

    pub last_refreshed: Option<DateTime<Utc>>,
}

/// Response for POST /alerts/refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    /// `completed`, `skipped` or `discarded`.
    pub report: &'static str,

    pub outcome: Option<FetchOutcome>,
}

/// Response for POST /alerts/:id/resolve.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    pub id: AlertId,

    /// False when the id was not on display. Not an error.
    pub found: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: &str, status: AlertStatus) -> Alert {
        Alert {
            id: AlertId::new(id),
            severity: Severity::Warning,
            component: "Pump 1".to_string(),
            message: "Flow rate low".to_string(),
            timestamp: "5m ago".to_string(),
            status,
        }
    }

    #[test]
    fn test_severity_synonyms_deserialize() {
        let high: Severity = serde_json::from_str("\"High\"").unwrap();
        let medium: Severity = serde_json::from_str("\"Medium\"").unwrap();
        let low: Severity = serde_json::from_str("\"Low\"").unwrap();

        assert_eq!(high, Severity::Critical);
        assert_eq!(medium, Severity::Warning);
        assert_eq!(low, Severity::Info);
        assert_eq!(serde_json::to_string(&high).unwrap(), "\"Critical\"");
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("HIGH".parse::<Severity>(), Ok(Severity::Critical));
        assert_eq!(" warning ".parse::<Severity>(), Ok(Severity::Warning));
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_derived_id_ignores_case_and_volatile_fields() {
        let a = AlertId::derive("Nutrient Tank A", "pH drifting high");
        let b = AlertId::derive("  nutrient tank a", "PH DRIFTING HIGH ");
        let c = AlertId::derive("Nutrient Tank B", "pH drifting high");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("alert-"));
        assert_eq!(a.as_str().len(), "alert-".len() + 16);
    }

    #[test]
    fn test_raw_alert_id_strategies() {
        let raw: RawAlert = serde_json::from_value(serde_json::json!({
            "id": "src-1",
            "severity": "High",
            "component": "Lighting System - Rack 3",
            "message": "LED driver overheating",
            "timestamp": "2h ago",
            "status": "Active"
        }))
        .unwrap();

        let trusted = raw.clone().into_alert(IdStrategy::SourceId);
        assert_eq!(trusted.id.as_str(), "src-1");
        assert_eq!(trusted.severity, Severity::Critical);

        let hashed = raw.into_alert(IdStrategy::ContentHash);
        assert_eq!(
            hashed.id,
            AlertId::derive("Lighting System - Rack 3", "LED driver overheating")
        );
    }

    #[test]
    fn test_raw_alert_blank_id_is_derived() {
        let raw: RawAlert = serde_json::from_value(serde_json::json!({
            "id": "  ",
            "severity": "Low",
            "component": "Sensor 4",
            "message": "Battery at 20%",
            "status": "Resolved"
        }))
        .unwrap();

        let alert = raw.into_alert(IdStrategy::SourceId);
        assert_eq!(alert.id, AlertId::derive("Sensor 4", "Battery at 20%"));
        assert_eq!(alert.timestamp, "");
        assert_eq!(alert.status, AlertStatus::Resolved);
    }

    #[test]
    fn test_farm_context_validation() {
        let mut context = FarmContext {
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            crop_name: "Lettuce".to_string(),
            farm_type: "Hydroponics".to_string(),
        };
        assert_eq!(context.validate(), Ok(()));

        context.state = " ".to_string();
        assert_eq!(
            context.validate(),
            Err(ValidationError::MissingField("state"))
        );

        assert_eq!(
            FarmContext::default().validate(),
            Err(ValidationError::MissingField("city"))
        );
    }

    #[test]
    fn test_preferences_wants() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.wants(Severity::Critical));
        assert!(!prefs.wants(Severity::Warning));
        assert!(!prefs.wants(Severity::Info));

        let everything = NotificationPreferences {
            email_enabled: true,
            notify_on_critical: true,
            notify_on_warning: true,
        };
        assert!(everything.wants(Severity::Warning));
        assert!(!everything.wants(Severity::Info));

        let muted = NotificationPreferences {
            email_enabled: false,
            ..everything
        };
        assert!(!muted.wants(Severity::Critical));
    }

    #[test]
    fn test_display_state_from_alerts_orders_and_dedups() {
        let state = DisplayState::from_alerts(vec![
            alert("r1", AlertStatus::Resolved),
            alert("a1", AlertStatus::Active),
            alert("dup", AlertStatus::Active),
            alert("a2", AlertStatus::Active),
            alert("dup", AlertStatus::Resolved),
        ]);

        let ids: Vec<&str> = state.alerts().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "r1", "dup"]);
        assert_eq!(
            state.get(&AlertId::new("dup")).map(|a| a.status),
            Some(AlertStatus::Resolved)
        );
    }

    #[test]
    fn test_fetch_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&FetchOutcome::UsedCache).unwrap(),
            "\"used_cache\""
        );
        assert!(FetchOutcome::UsedCache.is_stale());
        assert!(!FetchOutcome::Success.is_stale());
    }
}
