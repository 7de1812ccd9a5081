use anyhow::Context;
use marquee_api::{config::ApiConfig, startup::Application};
use marquee_config::{load_config, shared::EventLogConfig};
use marquee_telemetry::tracing::init_tracing;
use tracing::info;

/// Entry point for the marquee API service.
///
/// Initializes tracing, builds the application, and runs it until the
/// termination coordinator allows the process to exit.
fn main() -> anyhow::Result<()> {
    // Initialize tracing from the binary name
    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    // The background units run concurrently with the request path, so the
    // multi-threaded runtime is used instead of the actix system.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())?;

    Ok(())
}

/// Main async function that loads the configuration and starts the service.
async fn async_main() -> anyhow::Result<()> {
    let config =
        load_config::<ApiConfig>().context("loading API configuration for server startup")?;
    log_application_config(&config);

    let application = Application::build(config).await?;
    info!(port = application.port(), "marquee api listening");

    application.run_until_stopped().await?;

    Ok(())
}

fn log_application_config(config: &ApiConfig) {
    let event_log = match &config.event_log {
        EventLogConfig::Memory => "memory",
        EventLogConfig::Nats(_) => "nats",
    };

    info!(
        host = config.application.host,
        port = config.application.port,
        event_log,
        tick_interval_secs = config.scheduler.tick_interval_secs,
        shutdown_grace_secs = config.scheduler.shutdown_grace_secs,
        "application options",
    );
}
