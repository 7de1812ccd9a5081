//! Composition of the service's background units.
//!
//! A [`Runtime`] owns everything that runs outside the request path: the event
//! publisher, its delivery worker when buffering is active, and the background
//! scheduler. Every unit subscribes to one shutdown channel held by the runtime,
//! so a single [`Runtime::shutdown`] call reaches all of them and
//! [`Runtime::wait`] joins them afterwards. Nothing here is process-global; a
//! test can stand up several runtimes side by side.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use marquee_config::shared::{EventLogConfig, SchedulerConfig};

use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::eventlog::EventLogError;
use crate::publish::buffered::PublishWorkerHandle;
use crate::publish::{EventPublisher, PublishError, create_publisher};
use crate::scheduler::{Scheduler, SchedulerError, SchedulerHandle, SchedulerState, TickJob};

/// Extra time the scheduler gets past its grace window before being forced to stop.
const SCHEDULER_STOP_MARGIN: Duration = Duration::from_secs(1);

/// Errors that can occur while starting or stopping the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    EventLog(#[from] EventLogError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Handle to the started background units.
pub struct Runtime {
    shutdown_tx: ShutdownTx,
    publisher: Arc<dyn EventPublisher>,
    publish_worker: Option<PublishWorkerHandle>,
    scheduler: Option<SchedulerHandle>,
    grace_delay: Duration,
}

impl Runtime {
    /// Starts the background units selected by the configuration.
    ///
    /// Connecting to the event log and provisioning its stream happen here, before
    /// any traffic is accepted, so a broken event log configuration fails the boot
    /// instead of surfacing on the first request.
    pub async fn start<J: TickJob>(
        event_log: &EventLogConfig,
        scheduler: &SchedulerConfig,
        job: J,
    ) -> Result<Runtime, RuntimeError> {
        // A single channel reaches every unit, so one shutdown call is enough.
        let (shutdown_tx, _) = create_shutdown_channel();

        let (publisher, publish_worker) =
            create_publisher(event_log, shutdown_tx.subscribe()).await?;

        Ok(Self::assemble(
            shutdown_tx,
            publisher,
            publish_worker,
            scheduler,
            job,
        ))
    }

    /// Starts the background units around an externally built publisher.
    ///
    /// Used by tests that want to observe published envelopes without a broker.
    pub fn start_with_publisher<J: TickJob>(
        publisher: Arc<dyn EventPublisher>,
        scheduler: &SchedulerConfig,
        job: J,
    ) -> Runtime {
        let (shutdown_tx, _) = create_shutdown_channel();

        Self::assemble(shutdown_tx, publisher, None, scheduler, job)
    }

    fn assemble<J: TickJob>(
        shutdown_tx: ShutdownTx,
        publisher: Arc<dyn EventPublisher>,
        publish_worker: Option<PublishWorkerHandle>,
        scheduler: &SchedulerConfig,
        job: J,
    ) -> Runtime {
        let scheduler_handle = Scheduler::new(
            job,
            scheduler.tick_interval(),
            scheduler.shutdown_grace(),
            shutdown_tx.subscribe(),
        )
        .start();

        Runtime {
            shutdown_tx,
            publisher,
            publish_worker,
            scheduler: Some(scheduler_handle),
            grace_delay: scheduler.shutdown_grace(),
        }
    }

    /// Returns the active event publisher.
    pub fn publisher(&self) -> Arc<dyn EventPublisher> {
        self.publisher.clone()
    }

    /// Returns the current state of the background scheduler.
    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler
            .as_ref()
            .map(|scheduler| scheduler.state())
            .unwrap_or(SchedulerState::Stopped)
    }

    /// Signals every background unit to stop.
    ///
    /// Returns immediately; combine with [`Runtime::wait`] to block until the
    /// units have stopped.
    pub fn shutdown(&self) {
        info!("shutting down the runtime");

        if let Err(err) = self.shutdown_tx.shutdown() {
            error!("failed to send shutdown signal to the runtime: {err}");
        }
    }

    /// Waits until every background unit has stopped.
    ///
    /// Callers trigger [`Runtime::shutdown`] first; the deadlines below start
    /// counting from this call. The scheduler gets its grace window plus a small
    /// margin and is forced to stop past that, which is logged but not an error.
    /// Only a panicked unit is reported as an error.
    pub async fn wait(mut self) -> Result<(), RuntimeError> {
        let mut first_error: Option<RuntimeError> = None;

        // The scheduler drain is the long pole; the publish worker flushes
        // concurrently and is joined after.
        if let Some(scheduler) = self.scheduler.take() {
            if let Err(err) = scheduler
                .wait_within(self.grace_delay + SCHEDULER_STOP_MARGIN)
                .await
            {
                first_error.get_or_insert(err.into());
            }
        }

        if let Some(publish_worker) = self.publish_worker.take() {
            if let Err(err) = publish_worker.wait().await {
                first_error.get_or_insert(err.into());
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Signals shutdown and waits for the units to stop.
    pub async fn shutdown_and_wait(self) -> Result<(), RuntimeError> {
        self.shutdown();
        self.wait().await
    }

    /// Stops every background unit immediately, skipping drains and flushes.
    pub async fn abort(mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.abort().await;
        }

        if let Some(publish_worker) = self.publish_worker.take() {
            publish_worker.abort().await;
        }
    }
}
