use std::fmt;

use marquee_config::Config;
use marquee_config::shared::{EventLogConfig, SchedulerConfig, ValidationError};
use serde::Deserialize;

/// Complete configuration for the marquee API service.
///
/// Contains all settings required to run the service: the HTTP listener, the
/// event log the catalog announcements go to, and the background scheduler.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Application server settings.
    pub application: ApplicationSettings,
    /// Event log backend the catalog announcements are published to.
    pub event_log: EventLogConfig,
    /// Background scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl ApiConfig {
    /// Validates the loaded configuration before the service starts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.event_log.validate()?;
        self.scheduler.validate()?;

        Ok(())
    }
}

impl Config for ApiConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["event_log.nats.servers"];
}

/// HTTP server configuration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    /// Host address the API listens on.
    pub host: String,
    /// Port number the API listens on.
    pub port: u16,
}

impl fmt::Display for ApplicationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    host: {}", self.host)?;
        writeln!(f, "    port: {}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use marquee_config::shared::PublishMode;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_api_config_deserializes_with_defaults() {
        let value = json!({
            "application": {
                "host": "127.0.0.1",
                "port": 8080
            },
            "event_log": "memory"
        });

        let config: ApiConfig = serde_json::from_value(value).unwrap();

        assert_eq!(config.application.host, "127.0.0.1");
        assert_eq!(config.application.port, 8080);
        assert!(matches!(config.event_log, EventLogConfig::Memory));
        assert_eq!(
            config.scheduler.tick_interval_secs,
            SchedulerConfig::DEFAULT_TICK_INTERVAL_SECS
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_config_deserializes_nats_event_log() {
        let value = json!({
            "application": {
                "host": "0.0.0.0",
                "port": 8080
            },
            "event_log": {
                "nats": {
                    "servers": ["nats://localhost:4222"],
                    "topic": "titles",
                    "publish_mode": "asynchronous"
                }
            }
        });

        let config: ApiConfig = serde_json::from_value(value).unwrap();

        let EventLogConfig::Nats(nats) = &config.event_log else {
            panic!("expected a nats backend");
        };
        assert_eq!(nats.topic, "titles");
        assert!(matches!(nats.publish_mode, PublishMode::Asynchronous));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_config_validation_rejects_invalid_event_log() {
        let value = json!({
            "application": {
                "host": "0.0.0.0",
                "port": 8080
            },
            "event_log": {
                "nats": {
                    "servers": [],
                    "topic": "titles"
                }
            }
        });

        let config: ApiConfig = serde_json::from_value(value).unwrap();

        assert!(config.validate().is_err());
    }
}
