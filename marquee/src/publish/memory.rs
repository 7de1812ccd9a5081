//! In-memory publisher for local runs and tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::publish::{EventEnvelope, EventPublisher, PublishError};

/// Publisher that appends envelopes to an in-memory buffer instead of a broker.
///
/// Cloning is cheap and all clones share the same buffer, so tests can hold on
/// to one clone and inspect what the system under test published.
#[derive(Debug, Clone)]
pub struct MemoryPublisher {
    inner: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a copy of every envelope published so far, in publish order.
    pub async fn envelopes(&self) -> Vec<EventEnvelope> {
        self.inner.lock().await.clone()
    }

    /// Clears the buffered envelopes.
    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}

impl Default for MemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), PublishError> {
        self.inner.lock().await.push(envelope);

        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_preserves_payload_bytes() {
        let publisher = MemoryPublisher::new();

        // Payloads are opaque bytes, not necessarily valid UTF-8.
        let payload = vec![0u8, 0x9f, 0x92, 0x96, 0xff];
        publisher
            .publish(EventEnvelope::new(payload.clone()))
            .await
            .unwrap();

        let envelopes = publisher.envelopes().await;
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].payload().as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn test_clones_share_the_buffer() {
        let publisher = MemoryPublisher::new();
        let observer = publisher.clone();

        publisher
            .publish(EventEnvelope::new(vec![1u8, 2, 3]))
            .await
            .unwrap();

        assert_eq!(observer.envelopes().await.len(), 1);

        observer.clear().await;
        assert!(publisher.envelopes().await.is_empty());
    }
}
