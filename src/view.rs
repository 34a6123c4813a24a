//! Read-only views over the display state.
//!
//! Filtering and severity sorting happen here, on a copy. The display state
//! itself is never re-sorted by severity.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Alert, AlertStatus, DisplayState, Severity};

/// Which statuses to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    #[default]
    Active,
    Resolved,
}

impl StatusFilter {
    fn matches(&self, status: AlertStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status == AlertStatus::Active,
            StatusFilter::Resolved => status == AlertStatus::Resolved,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "resolved" => Ok(StatusFilter::Resolved),
            other => Err(format!("unknown status filter '{other}'")),
        }
    }
}

/// Filter applied to the display state before showing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlertFilter {
    pub status: StatusFilter,
    /// `None` shows every severity.
    pub severity: Option<Severity>,
}

impl AlertFilter {
    /// Parse the raw query values. Absent values take the defaults.
    pub fn parse(status: Option<&str>, severity: Option<&str>) -> Result<Self, String> {
        let status: StatusFilter = status
            .map(str::parse::<StatusFilter>)
            .transpose()?
            .unwrap_or_default();
        let severity = match severity {
            Some(s) if s.trim().eq_ignore_ascii_case("all") => None,
            Some(s) => Some(s.parse::<Severity>()?),
            None => None,
        };
        Ok(Self { status, severity })
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.status.matches(alert.status)
            && self.severity.is_none_or(|severity| alert.severity == severity)
    }
}

/// Alerts matching `filter`, Active first and then most severe first.
pub fn filtered_view(state: &DisplayState, filter: &AlertFilter) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = state
        .alerts()
        .iter()
        .filter(|alert| filter.matches(alert))
        .cloned()
        .collect();

    alerts.sort_by_key(|alert| (!alert.status.is_active(), alert.severity.rank()));
    alerts
}

/// Counts over a list of alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl AlertSummary {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut summary = Self {
            total: alerts.len(),
            ..Self::default()
        };

        for alert in alerts {
            match alert.status {
                AlertStatus::Active => summary.active += 1,
                AlertStatus::Resolved => summary.resolved += 1,
            }
            match alert.severity {
                Severity::Critical => summary.critical += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Info => summary.info += 1,
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlertId;

    fn alert(id: &str, severity: Severity, status: AlertStatus) -> Alert {
        Alert {
            id: AlertId::new(id),
            severity,
            component: "Rack 2".to_string(),
            message: "Humidity above target".to_string(),
            timestamp: "10m ago".to_string(),
            status,
        }
    }

    fn sample_state() -> DisplayState {
        DisplayState::from_alerts(vec![
            alert("info-a", Severity::Info, AlertStatus::Active),
            alert("crit-a", Severity::Critical, AlertStatus::Active),
            alert("warn-r", Severity::Warning, AlertStatus::Resolved),
            alert("warn-a", Severity::Warning, AlertStatus::Active),
            alert("crit-r", Severity::Critical, AlertStatus::Resolved),
        ])
    }

    fn ids(alerts: &[Alert]) -> Vec<&str> {
        alerts.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_default_filter_shows_active_by_severity() {
        let view = filtered_view(&sample_state(), &AlertFilter::default());

        assert_eq!(ids(&view), vec!["crit-a", "warn-a", "info-a"]);
    }

    #[test]
    fn test_all_filter_sorts_active_first_then_severity() {
        let filter = AlertFilter::parse(Some("all"), None).unwrap();

        let view = filtered_view(&sample_state(), &filter);

        assert_eq!(
            ids(&view),
            vec!["crit-a", "warn-a", "info-a", "crit-r", "warn-r"]
        );
    }

    #[test]
    fn test_severity_filter_accepts_synonyms() {
        let filter = AlertFilter::parse(Some("all"), Some("medium")).unwrap();

        let view = filtered_view(&sample_state(), &filter);

        assert_eq!(ids(&view), vec!["warn-a", "warn-r"]);
    }

    #[test]
    fn test_view_does_not_reorder_state() {
        let state = sample_state();
        let before = state.clone();

        let _ = filtered_view(&state, &AlertFilter::parse(Some("all"), None).unwrap());

        assert_eq!(state, before);
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert!(AlertFilter::parse(Some("open"), None).is_err());
        assert!(AlertFilter::parse(None, Some("severe")).is_err());
        assert_eq!(
            AlertFilter::parse(None, Some("All")).unwrap(),
            AlertFilter::default()
        );
    }

    #[test]
    fn test_summary_counts() {
        let state = sample_state();

        let summary = AlertSummary::from_alerts(state.alerts());

        assert_eq!(summary.total, 5);
        assert_eq!(summary.active, 3);
        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.critical, 2);
        assert_eq!(summary.warning, 2);
        assert_eq!(summary.info, 1);
    }
}
