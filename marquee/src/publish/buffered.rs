//! Buffered fire-and-forget publishing.
//!
//! The buffered publisher accepts envelopes into a bounded in-process queue and
//! returns to the caller immediately; enqueueing is the only operation that can
//! fail. A dedicated worker drains the queue, performs the deliveries against the
//! underlying sink, and logs delivery failures, which are never surfaced to the
//! original caller because the caller has already returned. On shutdown the queue
//! is closed and every envelope accepted so far is flushed before the worker
//! stops.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::concurrency::shutdown::ShutdownRx;
use crate::publish::{EventEnvelope, EventPublisher, PublishError};

/// Handle to the running buffered delivery worker.
#[derive(Debug)]
pub struct PublishWorkerHandle {
    join_handle: Option<JoinHandle<()>>,
}

impl PublishWorkerHandle {
    /// Waits for the delivery worker to stop.
    ///
    /// The worker stops once the shutdown signal has fired and the queue has been
    /// flushed. Returns an error only if the worker task panicked.
    pub async fn wait(mut self) -> Result<(), PublishError> {
        let Some(join_handle) = self.join_handle.take() else {
            return Ok(());
        };

        match join_handle.await {
            Ok(()) => Ok(()),
            Err(err) if err.is_cancelled() => Ok(()),
            Err(err) => {
                error!(error = %err, "publish worker task panicked");
                Err(PublishError::WorkerPanicked(err.to_string()))
            }
        }
    }

    /// Aborts the delivery worker without flushing the queue.
    pub async fn abort(mut self) {
        let Some(join_handle) = self.join_handle.take() else {
            return;
        };

        join_handle.abort();
        let _ = join_handle.await;
    }
}

/// Publisher that enqueues envelopes and returns before any delivery happens.
#[derive(Debug, Clone)]
pub struct BufferedPublisher {
    queue_tx: mpsc::Sender<EventEnvelope>,
}

impl BufferedPublisher {
    /// Starts a buffered publisher draining into `sink`.
    ///
    /// `capacity` bounds how many envelopes can wait for delivery; once the queue
    /// is full, publishing fails with [`PublishError::BufferFull`] instead of
    /// blocking the caller.
    pub fn start(
        sink: Arc<dyn EventPublisher>,
        capacity: usize,
        shutdown_rx: ShutdownRx,
    ) -> (Self, PublishWorkerHandle) {
        let (queue_tx, queue_rx) = mpsc::channel(capacity);

        let worker = PublishWorker {
            queue_rx,
            sink,
            shutdown_rx,
            delivered: 0,
            failed: 0,
        };
        let join_handle = tokio::spawn(worker.run());

        (
            Self { queue_tx },
            PublishWorkerHandle {
                join_handle: Some(join_handle),
            },
        )
    }
}

#[async_trait]
impl EventPublisher for BufferedPublisher {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), PublishError> {
        self.queue_tx.try_send(envelope).map_err(|err| match err {
            TrySendError::Full(_) => PublishError::BufferFull,
            TrySendError::Closed(_) => PublishError::BufferClosed,
        })
    }

    fn name(&self) -> &'static str {
        "buffered"
    }
}

/// Background worker that performs the deliveries for a [`BufferedPublisher`].
struct PublishWorker {
    queue_rx: mpsc::Receiver<EventEnvelope>,
    sink: Arc<dyn EventPublisher>,
    shutdown_rx: ShutdownRx,
    delivered: u64,
    failed: u64,
}

impl PublishWorker {
    /// Main worker loop: deliver until shutdown, then flush the queue.
    async fn run(mut self) {
        info!(sink = self.sink.name(), "starting buffered publish worker");

        loop {
            tokio::select! {
                maybe_envelope = self.queue_rx.recv() => {
                    match maybe_envelope {
                        Some(envelope) => self.deliver(envelope).await,
                        None => break,
                    }
                }
                _ = self.shutdown_rx.wait_for_shutdown() => {
                    break;
                }
            }
        }

        // Close the queue so new publishes fail fast, then flush everything that
        // was accepted before the close.
        self.queue_rx.close();
        while let Some(envelope) = self.queue_rx.recv().await {
            self.deliver(envelope).await;
        }

        info!(
            delivered = self.delivered,
            failed = self.failed,
            "buffered publish worker stopped"
        );
    }

    async fn deliver(&mut self, envelope: EventEnvelope) {
        if let Err(err) = self.sink.publish(envelope).await {
            self.failed += 1;
            error!(sink = self.sink.name(), error = %err, "failed to deliver buffered event");
        } else {
            self.delivered += 1;
        }
    }
}
