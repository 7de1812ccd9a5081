//! Event publishing for catalog announcements.
//!
//! The [`EventPublisher`] trait abstracts "announce an event" over two
//! interchangeable strategies selected once at configuration time: the
//! acknowledged variant blocks the caller until the broker confirms durable
//! receipt, the buffered variant enqueues and returns immediately while a
//! background worker performs the deliveries. Callers hold a trait object and
//! stay oblivious to which strategy is active.

pub mod acknowledged;
pub mod buffered;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use marquee_config::shared::{EventLogConfig, PublishMode};

use crate::concurrency::shutdown::ShutdownRx;
use crate::eventlog::{self, EventLogError};
use crate::publish::acknowledged::AcknowledgedPublisher;
use crate::publish::buffered::{BufferedPublisher, PublishWorkerHandle};
use crate::publish::memory::MemoryPublisher;

/// Opaque serialized payload announced on the event log.
///
/// The payload is delivered byte-for-byte unmodified. No ordering relationship is
/// guaranteed between envelopes published from concurrent requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    payload: Bytes,
}

impl EventEnvelope {
    /// Creates an envelope around a serialized payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Returns the payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consumes the envelope and returns the payload bytes.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

/// Errors that can occur while publishing an envelope.
///
/// None of these are fatal to the process: a failed publish is surfaced to the
/// caller (acknowledged mode) or logged by the delivery worker (buffered mode).
#[derive(Debug, Error)]
pub enum PublishError {
    /// Every publish attempt was rejected or timed out.
    #[error("failed to publish event after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: async_nats::jetstream::context::PublishError,
    },

    /// The buffered publish queue is at capacity.
    #[error("publish buffer is full, event dropped")]
    BufferFull,

    /// The buffered publish queue is no longer accepting envelopes.
    #[error("publish buffer is closed, event dropped")]
    BufferClosed,

    /// The buffered delivery worker panicked.
    #[error("publish worker panicked: {0}")]
    WorkerPanicked(String),
}

/// A destination for catalog announcement envelopes.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one envelope.
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), PublishError>;

    /// Returns the name of the publisher, used for logging.
    fn name(&self) -> &'static str;
}

/// Creates the publisher selected by the event log configuration.
///
/// For the NATS backend this connects to the cluster and provisions the stream, so
/// any failure here is a bootstrap failure and the process must not start serving.
/// The returned worker handle is present when the buffered mode is active; it must
/// be waited on during shutdown so accepted envelopes get flushed.
pub async fn create_publisher(
    config: &EventLogConfig,
    shutdown_rx: ShutdownRx,
) -> Result<(Arc<dyn EventPublisher>, Option<PublishWorkerHandle>), EventLogError> {
    match config {
        EventLogConfig::Memory => {
            info!("created in-memory event publisher");

            Ok((Arc::new(MemoryPublisher::new()), None))
        }
        EventLogConfig::Nats(nats) => {
            let jetstream = eventlog::connect(&nats.servers).await?;
            eventlog::ensure_stream(
                &jetstream,
                &nats.topic,
                nats.partitions,
                nats.replication_factor,
            )
            .await?;

            let acknowledged = AcknowledgedPublisher::new(
                jetstream,
                nats.topic.clone(),
                nats.partitions,
                nats.publish_max_attempts,
            );

            info!(
                topic = %nats.topic,
                mode = nats.publish_mode.as_str(),
                "created event publisher"
            );

            match nats.publish_mode {
                PublishMode::Synchronous => Ok((Arc::new(acknowledged), None)),
                PublishMode::Asynchronous => {
                    let (buffered, worker_handle) = BufferedPublisher::start(
                        Arc::new(acknowledged),
                        nats.publish_buffer_size,
                        shutdown_rx,
                    );

                    Ok((Arc::new(buffered), Some(worker_handle)))
                }
            }
        }
    }
}
