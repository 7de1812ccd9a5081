//! Signal-driven shutdown sequencing for the service process.
//!
//! The [`TerminationCoordinator`] is the only subscriber of the process's
//! termination signals. On the first signal it immediately stops the listener
//! from accepting new connections and opens a bounded wait window: a second
//! signal inside the window is an operator override that forces an immediate
//! shutdown, while ordinary expiry proceeds to the graceful path. The graceful
//! path fires the shutdown notification so the background units start draining,
//! drains the listener under a bounded deadline, and keeps the process exit
//! blocked until every unit has confirmed completion.

use std::io;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use thiserror::Error;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use marquee::runtime::{Runtime, RuntimeError};

/// Bounded wait between the first termination signal and the graceful shutdown.
///
/// A second signal inside this window forces an immediate shutdown. The same
/// value bounds the listener drain that follows the window.
pub const SHUTDOWN_WAIT_WINDOW: Duration = Duration::from_secs(5);

/// Extra time the listener stop gets past the drain deadline before the drain
/// is declared failed.
const LISTENER_STOP_MARGIN: Duration = Duration::from_secs(1);

/// Errors that can occur while coordinating the process shutdown.
#[derive(Debug, Error)]
pub enum TerminationError {
    /// A signal handler could not be registered at startup.
    #[error("failed to register the {signal} signal handler: {source}")]
    SignalHandler {
        signal: &'static str,
        #[source]
        source: io::Error,
    },

    /// The listener did not finish draining within the bounded deadline.
    #[error("http listener failed to drain within {deadline_secs}s")]
    ListenerDrainTimeout { deadline_secs: u64 },

    /// The listener stopped with an error.
    #[error("http listener failed: {0}")]
    Listener(#[source] io::Error),

    /// The listener task panicked.
    #[error("http listener task panicked: {0}")]
    ListenerPanicked(String),

    /// A background unit failed to stop cleanly.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Source of process termination signals.
///
/// Each call to [`SignalSource::recv`] resolves on the next signal, so a second
/// delivery during the wait window is observable as a distinct event.
pub trait SignalSource: Send {
    /// Resolves when the next termination signal arrives.
    fn recv(&mut self) -> impl Future<Output = ()> + Send;
}

/// OS termination signals: SIGINT (interrupt) and SIGTERM (terminate).
///
/// SIGTERM is what Kubernetes sends before SIGKILL during pod termination;
/// SIGINT covers an operator's ctrl+c in the foreground.
pub struct TerminationSignals {
    sigint: Signal,
    sigterm: Signal,
}

impl TerminationSignals {
    /// Registers the SIGINT and SIGTERM handlers.
    pub fn new() -> Result<Self, TerminationError> {
        let sigint =
            signal(SignalKind::interrupt()).map_err(|source| TerminationError::SignalHandler {
                signal: "SIGINT",
                source,
            })?;
        let sigterm =
            signal(SignalKind::terminate()).map_err(|source| TerminationError::SignalHandler {
                signal: "SIGTERM",
                source,
            })?;

        Ok(Self { sigint, sigterm })
    }
}

impl SignalSource for TerminationSignals {
    async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv() => {
                info!("received SIGINT");
            }
            _ = self.sigterm.recv() => {
                info!("received SIGTERM");
            }
        }
    }
}

/// Control surface of the HTTP listener.
///
/// Abstracts the actix server handle so the shutdown sequencing can be
/// exercised without a bound socket.
pub trait ListenerControl: Send {
    /// Stops accepting new connections; requests in flight keep running.
    fn pause(&self) -> impl Future<Output = ()> + Send;

    /// Stops the listener, draining in-flight requests when `graceful`.
    fn stop(&self, graceful: bool) -> impl Future<Output = ()> + Send;
}

impl ListenerControl for ServerHandle {
    async fn pause(&self) {
        ServerHandle::pause(self).await;
    }

    async fn stop(&self, graceful: bool) {
        ServerHandle::stop(self, graceful).await;
    }
}

/// Lifecycle state of the termination coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Waiting for the first termination signal.
    Armed,
    /// Signal received; sequencing the listener and background unit shutdown.
    ShuttingDown,
    /// Terminal state; every unit has stopped.
    Exited,
}

impl CoordinatorState {
    /// Returns the string name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorState::Armed => "armed",
            CoordinatorState::ShuttingDown => "shutting_down",
            CoordinatorState::Exited => "exited",
        }
    }
}

/// Coordinator that turns termination signals into an ordered shutdown.
pub struct TerminationCoordinator<S> {
    signals: S,
    wait_window: Duration,
    state_tx: watch::Sender<CoordinatorState>,
}

impl<S: SignalSource> TerminationCoordinator<S> {
    /// Creates a coordinator with the default wait window.
    pub fn new(signals: S) -> Self {
        Self::with_wait_window(signals, SHUTDOWN_WAIT_WINDOW)
    }

    /// Creates a coordinator with a custom wait window.
    ///
    /// Tests use short windows to keep shutdown scenarios fast.
    pub fn with_wait_window(signals: S, wait_window: Duration) -> Self {
        let (state_tx, _) = watch::channel(CoordinatorState::Armed);

        Self {
            signals,
            wait_window,
            state_tx,
        }
    }

    /// Returns a receiver that observes every state change.
    pub fn state_stream(&self) -> watch::Receiver<CoordinatorState> {
        self.state_tx.subscribe()
    }

    /// Runs the coordinator until the process is allowed to exit.
    ///
    /// Consumes the runtime: whichever shutdown path is taken, every background
    /// unit has been stopped by the time this returns. An `Err` means the
    /// process must exit non-zero; a forced (second-signal) shutdown is an
    /// operator override, not an error.
    pub async fn run<L: ListenerControl>(
        mut self,
        listener: L,
        mut listener_task: JoinHandle<io::Result<()>>,
        runtime: Runtime,
    ) -> Result<(), TerminationError> {
        info!("termination coordinator armed, waiting for a signal");

        tokio::select! {
            _ = self.signals.recv() => {}
            result = &mut listener_task => {
                // The listener stopped without being told to. Drain the background
                // units so their in-progress work is not cut short, then surface
                // the listener's exit as the cause.
                error!("http listener stopped unexpectedly, shutting down");
                self.update_state(CoordinatorState::ShuttingDown);

                let runtime_result = runtime.shutdown_and_wait().await;
                self.update_state(CoordinatorState::Exited);

                resolve_listener_exit(result)?;
                runtime_result?;
                return Ok(());
            }
        }

        self.update_state(CoordinatorState::ShuttingDown);

        // New connections are refused from this point on; requests already in
        // flight keep running through the wait window.
        listener.pause().await;
        info!(
            wait_window_secs = self.wait_window.as_secs(),
            "termination signal received, waiting before graceful shutdown"
        );

        let escalated = tokio::select! {
            _ = self.signals.recv() => true,
            _ = sleep(self.wait_window) => false,
        };

        if escalated {
            // Operator override: skip the graceful drain entirely.
            warn!("second termination signal received, forcing immediate shutdown");

            listener.stop(false).await;
            listener_task.abort();
            let _ = listener_task.await;
            runtime.abort().await;

            self.update_state(CoordinatorState::Exited);
            info!("forced shutdown complete");

            return Ok(());
        }

        // Graceful path: wake the background units first so they drain while the
        // listener finishes its in-flight requests.
        runtime.shutdown();

        info!(
            drain_deadline_secs = self.wait_window.as_secs(),
            "draining http listener"
        );

        if timeout(self.wait_window + LISTENER_STOP_MARGIN, listener.stop(true))
            .await
            .is_err()
        {
            error!("http listener failed to drain in time, aborting the process");
            return Err(TerminationError::ListenerDrainTimeout {
                deadline_secs: self.wait_window.as_secs(),
            });
        }

        resolve_listener_exit(listener_task.await)?;

        // The exit path stays blocked until the scheduler has stopped and every
        // accepted envelope has been flushed.
        runtime.wait().await?;

        self.update_state(CoordinatorState::Exited);
        info!("graceful shutdown complete");

        Ok(())
    }

    /// Updates the coordinator state and notifies any watchers.
    fn update_state(&self, state: CoordinatorState) {
        let _ = self.state_tx.send(state);
        debug!(state = %state.as_str(), "termination coordinator state changed");
    }
}

fn resolve_listener_exit(result: Result<io::Result<()>, JoinError>) -> Result<(), TerminationError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(TerminationError::Listener(err)),
        Err(err) if err.is_cancelled() => Ok(()),
        Err(err) => {
            error!(error = %err, "http listener task panicked");
            Err(TerminationError::ListenerPanicked(err.to_string()))
        }
    }
}
