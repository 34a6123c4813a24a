//! Runtime configuration from environment variables.
//!
//! Every setting has a default. Values that fail to parse fall back to the
//! default rather than aborting startup.

use std::env;
use std::time::Duration;

use crate::controller::DEFAULT_FETCH_TIMEOUT;
use crate::data_sources::generator::DEFAULT_GENERATOR_URL;
use crate::model::{FarmContext, IdStrategy, NotificationPreferences};
use crate::monitor::DEFAULT_POLL_INTERVAL;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_PATH: &str = "sqlite:cropwatch.db?mode=rwc";

/// Recipient named in simulated notifications when none is configured.
pub const DEFAULT_RECIPIENT: &str = "your email";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub source_url: String,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub id_strategy: IdStrategy,
    pub context: FarmContext,
    pub preferences: NotificationPreferences,
    pub notify_recipient: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DB_PATH.to_string(),
            source_url: DEFAULT_GENERATOR_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            id_strategy: IdStrategy::default(),
            context: FarmContext::default(),
            preferences: NotificationPreferences::default(),
            notify_recipient: DEFAULT_RECIPIENT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(default)
        };

        Self {
            port: lookup("CROPWATCH_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            database_url: text("CROPWATCH_DATABASE_URL", defaults.database_url),
            source_url: text("CROPWATCH_SOURCE_URL", defaults.source_url),
            poll_interval: secs("CROPWATCH_POLL_SECS", defaults.poll_interval),
            fetch_timeout: secs("CROPWATCH_FETCH_TIMEOUT_SECS", defaults.fetch_timeout),
            id_strategy: lookup("CROPWATCH_ID_STRATEGY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.id_strategy),
            context: FarmContext {
                city: text("CROPWATCH_CITY", String::new()),
                state: text("CROPWATCH_STATE", String::new()),
                crop_name: text("CROPWATCH_CROP", String::new()),
                farm_type: text("CROPWATCH_FARM_TYPE", String::new()),
            },
            preferences: NotificationPreferences {
                email_enabled: flag("CROPWATCH_NOTIFY_EMAIL", defaults.preferences.email_enabled),
                notify_on_critical: flag(
                    "CROPWATCH_NOTIFY_CRITICAL",
                    defaults.preferences.notify_on_critical,
                ),
                notify_on_warning: flag(
                    "CROPWATCH_NOTIFY_WARNING",
                    defaults.preferences.notify_on_warning,
                ),
            },
            notify_recipient: text("CROPWATCH_NOTIFY_RECIPIENT", defaults.notify_recipient),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.id_strategy, IdStrategy::SourceId);
        assert_eq!(config.preferences, NotificationPreferences::default());
        assert!(config.context.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CROPWATCH_PORT", "8080"),
            ("CROPWATCH_POLL_SECS", "5"),
            ("CROPWATCH_ID_STRATEGY", "content"),
            ("CROPWATCH_CITY", "Jaipur"),
            ("CROPWATCH_STATE", "Rajasthan"),
            ("CROPWATCH_CROP", "Strawberry"),
            ("CROPWATCH_FARM_TYPE", "Aquaponics"),
            ("CROPWATCH_NOTIFY_WARNING", "yes"),
            ("CROPWATCH_NOTIFY_EMAIL", "off"),
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.id_strategy, IdStrategy::ContentHash);
        assert!(config.context.validate().is_ok());
        assert!(config.preferences.notify_on_warning);
        assert!(!config.preferences.email_enabled);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = load(&[
            ("CROPWATCH_PORT", "eighty"),
            ("CROPWATCH_FETCH_TIMEOUT_SECS", "0"),
            ("CROPWATCH_NOTIFY_CRITICAL", "maybe"),
        ]);

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        assert!(config.preferences.notify_on_critical);
    }
}
