#![allow(dead_code)]

use std::sync::Arc;

use marquee::publish::memory::MemoryPublisher;
use marquee_api::config::{ApiConfig, ApplicationSettings};
use marquee_api::routes::titles::{CreateTitleRequest, UpdateTitleRequest};
use marquee_api::startup::Application;
use marquee_api::termination::TerminationError;
use marquee_config::shared::{EventLogConfig, SchedulerConfig};

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    /// Records every envelope the app publishes; shared with the server.
    pub publisher: MemoryPublisher,
    server_handle: tokio::task::JoinHandle<Result<(), TerminationError>>,
}

impl TestApp {
    pub async fn health_check(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/health_check", &self.address))
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn create_title(&self, title: &CreateTitleRequest) -> reqwest::Response {
        self.api_client
            .post(format!("{}/v1/titles", &self.address))
            .json(title)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn read_title(&self, title_id: i64) -> reqwest::Response {
        self.api_client
            .get(format!("{}/v1/titles/{title_id}", &self.address))
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn update_title(
        &self,
        title_id: i64,
        title: &UpdateTitleRequest,
    ) -> reqwest::Response {
        self.api_client
            .put(format!("{}/v1/titles/{title_id}", &self.address))
            .json(title)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn delete_title(&self, title_id: i64) -> reqwest::Response {
        self.api_client
            .delete(format!("{}/v1/titles/{title_id}", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn read_all_titles(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/v1/titles", &self.address))
            .send()
            .await
            .expect("failed to execute request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

pub async fn spawn_test_app() -> TestApp {
    let base_address = "127.0.0.1";

    let config = ApiConfig {
        application: ApplicationSettings {
            host: base_address.to_string(),
            // Port 0 makes the OS assign a free port per test app.
            port: 0,
        },
        event_log: EventLogConfig::Memory,
        scheduler: SchedulerConfig {
            tick_interval_secs: 1,
            shutdown_grace_secs: 0,
        },
    };

    let publisher = MemoryPublisher::new();
    let app = Application::build_with_publisher(config, Arc::new(publisher.clone()))
        .expect("failed to build the application");
    let port = app.port();

    let server_handle = tokio::spawn(app.run_until_stopped());

    TestApp {
        address: format!("http://{base_address}:{port}"),
        api_client: reqwest::Client::new(),
        publisher,
        server_handle,
    }
}
