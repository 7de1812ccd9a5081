//! Broker-acknowledged publishing with bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::eventlog::partition_subject;
use crate::publish::{EventEnvelope, EventPublisher, PublishError};

/// Delay between attempts after a rejected or timed out send.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Publisher that blocks until the broker acknowledges durable receipt.
///
/// Each publish picks a uniformly random partition subject under the topic, sends
/// the payload, and awaits the broker's acknowledgment. Transient failures are
/// retried up to the configured attempt count before an error reaches the caller,
/// so the calling task is held for the duration of the send but never hangs
/// indefinitely.
pub struct AcknowledgedPublisher {
    jetstream: async_nats::jetstream::Context,
    topic: String,
    partitions: u16,
    max_attempts: u32,
}

impl AcknowledgedPublisher {
    /// Creates a new acknowledged publisher bound to a topic.
    pub fn new(
        jetstream: async_nats::jetstream::Context,
        topic: String,
        partitions: u16,
        max_attempts: u32,
    ) -> Self {
        Self {
            jetstream,
            topic,
            partitions,
            max_attempts,
        }
    }

    /// Picks a random partition subject; envelopes carry no key, so any partition
    /// may receive any envelope.
    fn pick_subject(&self) -> String {
        let partition = rand::thread_rng().gen_range(0..self.partitions);

        partition_subject(&self.topic, partition)
    }

    /// Sends the payload and waits for the broker's acknowledgment.
    async fn send_acknowledged(
        &self,
        subject: String,
        payload: Bytes,
    ) -> Result<(), async_nats::jetstream::context::PublishError> {
        let ack = self.jetstream.publish(subject, payload).await?;
        ack.await?;

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for AcknowledgedPublisher {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), PublishError> {
        let subject = self.pick_subject();
        let payload = envelope.into_payload();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self
                .send_acknowledged(subject.clone(), payload.clone())
                .await
            {
                Ok(()) => {
                    debug!(subject = %subject, attempts, "event acknowledged by the broker");
                    return Ok(());
                }
                Err(source) if attempts < self.max_attempts => {
                    warn!(
                        subject = %subject,
                        error = %source,
                        attempts,
                        "publish attempt failed, retrying"
                    );
                    sleep(RETRY_DELAY).await;
                }
                Err(source) => {
                    return Err(PublishError::RetriesExhausted { attempts, source });
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "acknowledged"
    }
}
