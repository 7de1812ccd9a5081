//! Tracing setup for the marquee binaries.
//!
//! Records are written to stdout through a non-blocking writer so logging never
//! stalls a request; the returned guard flushes what is still buffered when it is
//! dropped, so binaries keep it alive for the lifetime of the process. Production
//! output is line-delimited JSON for the log collector, development output is the
//! human-readable format. The filter comes from `RUST_LOG` and falls back to
//! `info`.

use std::sync::Once;

use marquee_config::Environment;
use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Default filter directive applied when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum InitTracingError {
    /// The runtime environment could not be determined.
    #[error("failed to load the runtime environment: {0}")]
    Environment(#[from] std::io::Error),

    /// Another global subscriber is already installed.
    #[error("failed to install the global tracing subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Initializes tracing for a service binary.
///
/// The returned guard must be held for the lifetime of the process; dropping it
/// flushes and stops the background log writer.
pub fn init_tracing(service_name: &str) -> Result<WorkerGuard, InitTracingError> {
    let environment = Environment::load()?;
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    match environment {
        Environment::Prod => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_writer(writer),
                )
                .try_init()?;
        }
        Environment::Dev => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(writer))
                .try_init()?;
        }
    }

    info!(service = service_name, environment = %environment, "tracing initialized");

    Ok(guard)
}

/// Initializes tracing for tests.
///
/// Installs the subscriber once per test binary and routes output through the
/// test writer so it is captured per test. Safe to call from every test.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}
