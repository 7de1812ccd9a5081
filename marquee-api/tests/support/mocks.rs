#![allow(dead_code)]

use marquee_api::routes::titles::CreateTitleRequest;

use crate::support::test_app::TestApp;

/// Builds a create request with deterministic fields derived from the id.
pub fn new_title(id: i64) -> CreateTitleRequest {
    CreateTitleRequest {
        id,
        title: format!("Title {id}"),
        overview: format!("Overview of title {id}"),
    }
}

/// Creates a title through the endpoint and returns the request that was sent.
pub async fn create_title(app: &TestApp, id: i64) -> CreateTitleRequest {
    let title = new_title(id);

    let response = app.create_title(&title).await;
    assert!(response.status().is_success());

    title
}
