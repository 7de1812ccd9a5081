//! Event log configuration for the catalog announcement publisher.

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration for the durable event log that catalog mutations are announced on.
///
/// Specifies the log backend and its associated parameters. The `memory` backend
/// records envelopes in process memory and is intended for tests and local
/// development; the `nats` backend publishes to a JetStream stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLogConfig {
    /// In-memory event sink, no broker involved.
    Memory,
    /// NATS JetStream backed event log.
    Nats(NatsEventLogConfig),
}

impl EventLogConfig {
    /// Validates the event log configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            EventLogConfig::Memory => Ok(()),
            EventLogConfig::Nats(config) => config.validate(),
        }
    }
}

/// Connection and publishing parameters for a JetStream backed event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NatsEventLogConfig {
    /// Server addresses of the NATS cluster, e.g. `nats://localhost:4222`.
    pub servers: Vec<String>,

    /// Name of the stream that announcements are published to.
    ///
    /// The stream binds the subject space `{topic}.*`, one subject per partition.
    pub topic: String,

    /// Number of partition subjects under the topic.
    ///
    /// Default: 1
    #[serde(default = "default_partitions")]
    pub partitions: u16,

    /// Number of stream replicas kept by the cluster.
    ///
    /// Default: 1
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,

    /// Whether publishes block for broker acknowledgment or are buffered.
    ///
    /// Default: synchronous
    #[serde(default)]
    pub publish_mode: PublishMode,

    /// Capacity of the in-process queue used by asynchronous publishing.
    ///
    /// Default: 256
    #[serde(default = "default_publish_buffer_size")]
    pub publish_buffer_size: usize,

    /// Maximum send attempts before a synchronous publish reports failure.
    ///
    /// Default: 10
    #[serde(default = "default_publish_max_attempts")]
    pub publish_max_attempts: u32,
}

impl NatsEventLogConfig {
    /// Default partition count: a single partition.
    pub const DEFAULT_PARTITIONS: u16 = 1;

    /// Default replication factor: a single replica.
    pub const DEFAULT_REPLICATION_FACTOR: usize = 1;

    /// Default asynchronous publish queue capacity.
    pub const DEFAULT_PUBLISH_BUFFER_SIZE: usize = 256;

    /// Default maximum publish attempts.
    pub const DEFAULT_PUBLISH_MAX_ATTEMPTS: u32 = 10;

    /// Validates the event log connection parameters.
    ///
    /// Ensures at least one server is configured, the partition and attempt counts
    /// are non-zero, and the replication factor is within the 1-5 range JetStream
    /// accepts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.servers.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "event_log.nats.servers".to_string(),
                constraint: "must contain at least one server address".to_string(),
            });
        }

        if self.topic.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "event_log.nats.topic".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        if self.partitions == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "event_log.nats.partitions".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.replication_factor == 0 || self.replication_factor > 5 {
            return Err(ValidationError::InvalidFieldValue {
                field: "event_log.nats.replication_factor".to_string(),
                constraint: "must be between 1 and 5".to_string(),
            });
        }

        if self.publish_buffer_size == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "event_log.nats.publish_buffer_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.publish_max_attempts == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "event_log.nats.publish_max_attempts".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// How a publish call relates to broker acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Block the caller until the broker acknowledges durable receipt.
    #[default]
    Synchronous,
    /// Enqueue and return immediately; delivery failures are logged, not surfaced.
    Asynchronous,
}

impl PublishMode {
    /// Returns the string name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishMode::Synchronous => "synchronous",
            PublishMode::Asynchronous => "asynchronous",
        }
    }
}

fn default_partitions() -> u16 {
    NatsEventLogConfig::DEFAULT_PARTITIONS
}

fn default_replication_factor() -> usize {
    NatsEventLogConfig::DEFAULT_REPLICATION_FACTOR
}

fn default_publish_buffer_size() -> usize {
    NatsEventLogConfig::DEFAULT_PUBLISH_BUFFER_SIZE
}

fn default_publish_max_attempts() -> u32 {
    NatsEventLogConfig::DEFAULT_PUBLISH_MAX_ATTEMPTS
}
