//! Periodic background scheduler with a graceful drain.
//!
//! The scheduler runs one unit of background work per tick while the service is up.
//! It never stops on its own: the shutdown signal moves it from [`SchedulerState::Running`]
//! into [`SchedulerState::Draining`], where it waits out a fixed grace window so an
//! in-progress pass can finish, and only then reports [`SchedulerState::Stopped`].
//!
//! A failed pass is logged and the loop keeps ticking. The scheduler's only external
//! contract is "ticks on schedule until told to stop, then stops within the grace
//! window"; the work itself is opaque behind the [`TickJob`] trait.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{MissedTickBehavior, interval, sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::concurrency::shutdown::ShutdownRx;

/// Errors that can occur while running the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler task panicked before reaching the stopped state.
    #[error("scheduler task panicked: {0}")]
    TaskPanicked(String),
}

/// A unit of background work executed once per scheduler tick.
pub trait TickJob: Send + 'static {
    /// Error produced by a failed pass.
    ///
    /// Failures are logged by the scheduler and never stop the loop.
    type Error: fmt::Display + Send;

    /// Returns the name of the job, used for logging.
    fn name(&self) -> &'static str;

    /// Runs one pass of the job.
    fn run(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Lifecycle state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created but not yet started.
    Idle,
    /// Ticking on schedule.
    Running,
    /// Shutdown observed, waiting out the grace window.
    Draining,
    /// Terminal state; completion has been signaled.
    Stopped,
}

impl SchedulerState {
    /// Returns the string name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Draining => "draining",
            SchedulerState::Stopped => "stopped",
        }
    }
}

/// Handle to a running scheduler.
///
/// Provides methods to observe the scheduler's state and wait for completion.
#[derive(Debug)]
pub struct SchedulerHandle {
    join_handle: Option<JoinHandle<()>>,
    state_rx: watch::Receiver<SchedulerState>,
}

impl SchedulerHandle {
    /// Returns the current state of the scheduler.
    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Returns a receiver that observes every state change.
    pub fn state_stream(&self) -> watch::Receiver<SchedulerState> {
        self.state_rx.clone()
    }

    /// Waits for the scheduler to stop.
    ///
    /// Returns `Ok(())` once the scheduler reached [`SchedulerState::Stopped`], or an
    /// error if the task panicked.
    pub async fn wait(mut self) -> Result<(), SchedulerError> {
        let Some(join_handle) = self.join_handle.take() else {
            return Ok(());
        };

        resolve_join(join_handle.await)
    }

    /// Waits for the scheduler to stop, forcing a stop past the deadline.
    ///
    /// A scheduler that fails to drain within `limit` is aborted and the forced stop
    /// is logged; only a panic inside the task is reported as an error.
    pub async fn wait_within(mut self, limit: Duration) -> Result<(), SchedulerError> {
        let Some(mut join_handle) = self.join_handle.take() else {
            return Ok(());
        };

        match timeout(limit, &mut join_handle).await {
            Ok(result) => resolve_join(result),
            Err(_) => {
                warn!(
                    limit_secs = limit.as_secs(),
                    "scheduler did not stop within its deadline, forcing stop"
                );
                join_handle.abort();
                let _ = join_handle.await;

                Ok(())
            }
        }
    }

    /// Aborts the scheduler without draining.
    pub async fn abort(mut self) {
        let Some(join_handle) = self.join_handle.take() else {
            return;
        };

        join_handle.abort();
        let _ = join_handle.await;
    }
}

fn resolve_join(result: Result<(), JoinError>) -> Result<(), SchedulerError> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_cancelled() => Ok(()),
        Err(err) => {
            error!(error = %err, "scheduler task panicked");
            Err(SchedulerError::TaskPanicked(err.to_string()))
        }
    }
}

/// Periodic background scheduler.
///
/// Created in [`SchedulerState::Idle`]; [`Scheduler::start`] moves it onto a background
/// task and hands back a [`SchedulerHandle`] for observation and completion.
pub struct Scheduler<J> {
    job: J,
    tick_interval: Duration,
    grace_delay: Duration,
    shutdown_rx: ShutdownRx,
    state_tx: watch::Sender<SchedulerState>,
}

impl<J: TickJob> Scheduler<J> {
    /// Creates a new scheduler for the given job.
    pub fn new(
        job: J,
        tick_interval: Duration,
        grace_delay: Duration,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Idle);

        Self {
            job,
            tick_interval,
            grace_delay,
            shutdown_rx,
            state_tx,
        }
    }

    /// Starts the scheduler in a background task.
    ///
    /// Returns a handle that can be used to wait for the scheduler to stop.
    pub fn start(self) -> SchedulerHandle {
        let state_rx = self.state_tx.subscribe();
        let join_handle = tokio::spawn(self.run());

        SchedulerHandle {
            join_handle: Some(join_handle),
            state_rx,
        }
    }

    /// Main scheduler loop: tick until shutdown, then drain.
    async fn run(mut self) {
        self.update_state(SchedulerState::Running);
        info!(
            job = self.job.name(),
            tick_interval_secs = self.tick_interval.as_secs(),
            "starting scheduler"
        );

        let mut tick = interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(err) = self.job.run().await {
                        error!(job = self.job.name(), error = %err, "background pass failed");
                    }
                }
                _ = self.shutdown_rx.wait_for_shutdown() => {
                    break;
                }
            }
        }

        self.update_state(SchedulerState::Draining);
        info!(
            job = self.job.name(),
            grace_secs = self.grace_delay.as_secs(),
            "scheduler received shutdown signal, draining"
        );

        sleep(self.grace_delay).await;

        self.update_state(SchedulerState::Stopped);
        info!(job = self.job.name(), "scheduler stopped");
    }

    /// Updates the scheduler state and notifies any watchers.
    fn update_state(&self, state: SchedulerState) {
        let _ = self.state_tx.send(state);
        debug!(state = %state.as_str(), "scheduler state changed");
    }
}
