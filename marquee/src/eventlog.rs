//! Event log provisioning against a NATS JetStream broker.
//!
//! A topic maps to a JetStream stream capturing the subjects `{topic}.*`, and
//! each partition maps to the subject `{topic}.{partition}`. Provisioning is
//! idempotent: ensuring a stream that already exists succeeds without touching
//! it. Connection or provisioning failures here are fatal, since they happen
//! before the service starts accepting traffic.

use async_nats::jetstream;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("failed to connect to the event log brokers at {servers}: {source}")]
    Connection {
        servers: String,
        #[source]
        source: async_nats::ConnectError,
    },
    #[error("failed to provision the event log stream {stream}: {source}")]
    StreamProvisioning {
        stream: String,
        #[source]
        source: jetstream::context::CreateStreamError,
    },
}

/// Connects to the event log brokers and returns a JetStream context.
pub async fn connect(servers: &[String]) -> Result<jetstream::Context, EventLogError> {
    let addresses = servers.join(",");

    match async_nats::connect(addresses.as_str()).await {
        Ok(client) => Ok(jetstream::new(client)),
        Err(source) => Err(EventLogError::Connection {
            servers: addresses,
            source,
        }),
    }
}

/// Ensures the stream backing `topic` exists with the requested shape.
///
/// Succeeds when the stream already exists, so every service instance can call
/// this at startup without coordination.
pub async fn ensure_stream(
    jetstream: &jetstream::Context,
    topic: &str,
    partitions: u16,
    replication_factor: usize,
) -> Result<(), EventLogError> {
    let config = jetstream::stream::Config {
        name: topic.to_string(),
        subjects: vec![stream_subjects(topic)],
        num_replicas: replication_factor,
        ..Default::default()
    };

    jetstream
        .get_or_create_stream(config)
        .await
        .map_err(|source| EventLogError::StreamProvisioning {
            stream: topic.to_string(),
            source,
        })?;

    info!(
        stream = topic,
        partitions,
        replicas = replication_factor,
        "event log stream ready"
    );

    Ok(())
}

/// Subject filter covering every partition of `topic`.
pub(crate) fn stream_subjects(topic: &str) -> String {
    format!("{topic}.*")
}

/// Subject carrying the envelopes of a single partition of `topic`.
pub(crate) fn partition_subject(topic: &str, partition: u16) -> String {
    format!("{topic}.{partition}")
}
