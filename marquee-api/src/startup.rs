use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, web};
use tracing_actix_web::TracingLogger;

use marquee::publish::EventPublisher;
use marquee::runtime::Runtime;

use crate::{
    config::ApiConfig,
    routes::{
        health_check::health_check,
        titles::{create_title, delete_title, read_all_titles, read_title, update_title},
    },
    store::CatalogStore,
    sweep::CatalogSweep,
    termination::{TerminationCoordinator, TerminationError, TerminationSignals},
};

/// Marquee API application server wrapper.
///
/// Owns the HTTP server and the background runtime; the two are built together so
/// a broken event log configuration fails the boot before the listener accepts
/// any traffic.
pub struct Application {
    port: u16,
    server: Server,
    runtime: Runtime,
}

impl Application {
    /// Builds and configures the API application server.
    ///
    /// Starts the background units, binds the listener, and wires the routes. The
    /// catalog store is shared between the request handlers and the sweep job.
    pub async fn build(config: ApiConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let store = CatalogStore::new();
        let runtime = Runtime::start(
            &config.event_log,
            &config.scheduler,
            CatalogSweep::new(store.clone()),
        )
        .await?;

        Self::assemble(&config, store, runtime)
    }

    /// Builds the API application server around an externally built publisher.
    ///
    /// Used by tests that want to observe published envelopes without a broker.
    pub fn build_with_publisher(
        config: ApiConfig,
        publisher: Arc<dyn EventPublisher>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let store = CatalogStore::new();
        let runtime = Runtime::start_with_publisher(
            publisher,
            &config.scheduler,
            CatalogSweep::new(store.clone()),
        );

        Self::assemble(&config, store, runtime)
    }

    fn assemble(config: &ApiConfig, store: CatalogStore, runtime: Runtime) -> anyhow::Result<Self> {
        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let server = run(listener, store, runtime.publisher())?;

        Ok(Self {
            port,
            server,
            runtime,
        })
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Runs the server until the termination coordinator allows the process to exit.
    ///
    /// The coordinator owns the process's termination signals and drives both the
    /// server and the background runtime through their shutdown sequence.
    pub async fn run_until_stopped(self) -> Result<(), TerminationError> {
        let signals = TerminationSignals::new()?;
        let listener = self.server.handle();
        let listener_task = tokio::spawn(self.server);

        TerminationCoordinator::new(signals)
            .run(listener, listener_task, self.runtime)
            .await
    }
}

/// Creates and configures the HTTP server with all routes and middleware.
///
/// Signal handling is disabled on the server: the termination coordinator is the
/// only subscriber of the process's signals and stops the server through its
/// handle instead.
pub fn run(
    listener: TcpListener,
    store: CatalogStore,
    publisher: Arc<dyn EventPublisher>,
) -> Result<Server, anyhow::Error> {
    let store = web::Data::new(store);
    let publisher: web::Data<dyn EventPublisher> = web::Data::from(publisher);

    let server = HttpServer::new(move || {
        let tracing_logger = TracingLogger::default();

        App::new()
            .wrap(tracing_logger)
            .service(health_check)
            .service(
                web::scope("v1")
                    // titles
                    .service(create_title)
                    .service(read_title)
                    .service(update_title)
                    .service(delete_title)
                    .service(read_all_titles),
            )
            .app_data(store.clone())
            .app_data(publisher.clone())
    })
    .listen(listener)?
    .disable_signals()
    .run();

    Ok(server)
}
