//! Price Server Configuration Settings
//!
//! Configuration types for the price server, loaded from environment variables.
//! Unparseable values fall back to their defaults; values that parse but make
//! no sense (zero workers, zero eviction period) are rejected.

use std::time::Duration;

use crate::domain::price::DEFAULT_EVICTION_THRESHOLD;

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// HTTP port for queries, health checks and metrics.
    pub http_port: u16,
    /// TCP mailbox listener port (0 = disabled).
    pub mailbox_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 8080,
            mailbox_port: 61616,
        }
    }
}

impl ServerSettings {
    /// Whether the TCP mailbox listener should be started.
    #[must_use]
    pub const fn mailbox_listener_enabled(&self) -> bool {
        self.mailbox_port != 0
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionSettings {
    /// Number of concurrent pipeline workers.
    pub workers: usize,
    /// Bounded mailbox capacity.
    pub mailbox_capacity: usize,
    /// Dead letters kept for inspection before the oldest are dropped.
    pub dead_letter_retention: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            mailbox_capacity: 1024,
            dead_letter_retention: 10_000,
        }
    }
}

/// Eviction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionSettings {
    /// Age past which a price is stale.
    pub threshold: Duration,
    /// Interval between eviction runs.
    pub period: Duration,
}

impl Default for EvictionSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_EVICTION_THRESHOLD,
            period: Duration::from_secs(60),
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Ingestion settings.
    pub ingestion: IngestionSettings,
    /// Eviction settings.
    pub eviction: EvictionSettings,
}

impl ServerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a setting has a value the server cannot run with.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for zero workers, zero mailbox
    /// capacity or a zero eviction period.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_defaults = ServerSettings::default();
        let server = ServerSettings {
            http_port: parse_or(&lookup, "PRICE_SERVER_HTTP_PORT", server_defaults.http_port),
            mailbox_port: parse_or(
                &lookup,
                "PRICE_SERVER_MAILBOX_PORT",
                server_defaults.mailbox_port,
            ),
        };

        let ingestion_defaults = IngestionSettings::default();
        let ingestion = IngestionSettings {
            workers: parse_or(
                &lookup,
                "PRICE_SERVER_INGEST_WORKERS",
                ingestion_defaults.workers,
            ),
            mailbox_capacity: parse_or(
                &lookup,
                "PRICE_SERVER_MAILBOX_CAPACITY",
                ingestion_defaults.mailbox_capacity,
            ),
            dead_letter_retention: parse_or(
                &lookup,
                "PRICE_SERVER_DEAD_LETTER_RETENTION",
                ingestion_defaults.dead_letter_retention,
            ),
        };

        let eviction_defaults = EvictionSettings::default();
        let eviction = EvictionSettings {
            threshold: parse_duration_secs(
                &lookup,
                "PRICE_SERVER_EVICTION_THRESHOLD_SECS",
                eviction_defaults.threshold,
            ),
            period: parse_duration_secs(
                &lookup,
                "PRICE_SERVER_EVICTION_PERIOD_SECS",
                eviction_defaults.period,
            ),
        };

        if ingestion.workers == 0 {
            return Err(ConfigError::invalid(
                "PRICE_SERVER_INGEST_WORKERS",
                "0",
                "at least one worker is required",
            ));
        }

        if ingestion.mailbox_capacity == 0 {
            return Err(ConfigError::invalid(
                "PRICE_SERVER_MAILBOX_CAPACITY",
                "0",
                "mailbox capacity must be positive",
            ));
        }

        if eviction.period.is_zero() {
            return Err(ConfigError::invalid(
                "PRICE_SERVER_EVICTION_PERIOD_SECS",
                "0",
                "eviction period must be positive",
            ));
        }

        Ok(Self {
            server,
            ingestion,
            eviction,
        })
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has a value the server cannot run with.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidValue {
            key,
            value: value.into(),
            reason,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_duration_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ServerConfig::from_lookup(|key| map.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn server_settings_defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.http_port, 8080);
        assert_eq!(settings.mailbox_port, 61616);
        assert!(settings.mailbox_listener_enabled());
    }

    #[test]
    fn ingestion_settings_defaults() {
        let settings = IngestionSettings::default();
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.mailbox_capacity, 1024);
        assert_eq!(settings.dead_letter_retention, 10_000);
    }

    #[test]
    fn eviction_settings_defaults() {
        let settings = EvictionSettings::default();
        assert_eq!(settings.threshold, Duration::from_secs(30 * 24 * 60 * 60));
        assert_eq!(settings.period, Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PRICE_SERVER_HTTP_PORT", "9000"),
            ("PRICE_SERVER_MAILBOX_PORT", "0"),
            ("PRICE_SERVER_INGEST_WORKERS", " 4 "),
            ("PRICE_SERVER_MAILBOX_CAPACITY", "64"),
            ("PRICE_SERVER_DEAD_LETTER_RETENTION", "5"),
            ("PRICE_SERVER_EVICTION_THRESHOLD_SECS", "3600"),
            ("PRICE_SERVER_EVICTION_PERIOD_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.server.http_port, 9000);
        assert!(!config.server.mailbox_listener_enabled());
        assert_eq!(config.ingestion.workers, 4);
        assert_eq!(config.ingestion.mailbox_capacity, 64);
        assert_eq!(config.ingestion.dead_letter_retention, 5);
        assert_eq!(config.eviction.threshold, Duration::from_secs(3600));
        assert_eq!(config.eviction.period, Duration::from_secs(5));
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("PRICE_SERVER_HTTP_PORT", "not-a-port"),
            ("PRICE_SERVER_MAILBOX_PORT", "70000"),
            ("PRICE_SERVER_INGEST_WORKERS", "-2"),
            ("PRICE_SERVER_EVICTION_THRESHOLD_SECS", "30d"),
        ])
        .unwrap();

        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn zero_workers_rejected() {
        let err = config_from(&[("PRICE_SERVER_INGEST_WORKERS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "PRICE_SERVER_INGEST_WORKERS",
                ..
            }
        ));
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = config_from(&[("PRICE_SERVER_MAILBOX_CAPACITY", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "PRICE_SERVER_MAILBOX_CAPACITY",
                ..
            }
        ));
    }

    #[test]
    fn zero_eviction_period_rejected() {
        let err = config_from(&[("PRICE_SERVER_EVICTION_PERIOD_SECS", "0")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value \"0\" for PRICE_SERVER_EVICTION_PERIOD_SECS: eviction period must be positive"
        );
    }

    #[test]
    fn zero_threshold_accepted() {
        let config = config_from(&[("PRICE_SERVER_EVICTION_THRESHOLD_SECS", "0")]).unwrap();
        assert!(config.eviction.threshold.is_zero());
    }
}
