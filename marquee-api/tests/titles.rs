use marquee_api::routes::ErrorMessage;
use marquee_api::routes::titles::{
    CreateTitleRequest, ReadTitleResponse, ReadTitlesResponse, UpdateTitleRequest,
};
use marquee_telemetry::tracing::init_test_tracing;
use reqwest::StatusCode;
use serde_json::{Value, json};

mod support;

use crate::support::mocks::{create_title, new_title};
use crate::support::test_app::spawn_test_app;

#[tokio::test(flavor = "multi_thread")]
async fn create_title_returns_created_and_announces_it() {
    init_test_tracing();

    let app = spawn_test_app().await;

    let title = CreateTitleRequest {
        id: 1,
        title: "Alien".to_string(),
        overview: "A commercial crew answers a distress call.".to_string(),
    };
    let response = app.create_title(&title).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: ReadTitleResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(body.id, 1);
    assert_eq!(body.title, "Alien");

    // The announcement carries the entity's JSON body unmodified.
    let envelopes = app.publisher.envelopes().await;
    assert_eq!(envelopes.len(), 1);
    let payload: Value =
        serde_json::from_slice(envelopes[0].payload()).expect("failed to parse announcement");
    assert_eq!(
        payload,
        json!({
            "id": 1,
            "title": "Alien",
            "overview": "A commercial crew answers a distress call.",
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn create_title_without_overview_defaults_to_empty() {
    init_test_tracing();

    let app = spawn_test_app().await;

    // The overview field is optional on create.
    let response = app
        .api_client
        .post(format!("{}/v1/titles", &app.address))
        .json(&json!({ "id": 7, "title": "Stalker" }))
        .send()
        .await
        .expect("failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.read_title(7).await;
    let body: ReadTitleResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(body.overview, "");
}

#[tokio::test(flavor = "multi_thread")]
async fn create_title_with_duplicate_id_returns_conflict() {
    init_test_tracing();

    let app = spawn_test_app().await;
    let title = create_title(&app, 1).await;

    let mut duplicate = new_title(1);
    duplicate.title = "Another title".to_string();
    let response = app.create_title(&duplicate).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error: ErrorMessage = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(error.error, "A title with id 1 already exists");

    // The rejected create is not announced and the catalog keeps the original.
    assert_eq!(app.publisher.envelopes().await.len(), 1);
    let response = app.read_title(1).await;
    let body: ReadTitleResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(body.title, title.title);
}

#[tokio::test(flavor = "multi_thread")]
async fn read_title_returns_the_stored_title() {
    init_test_tracing();

    let app = spawn_test_app().await;
    let title = create_title(&app, 42).await;

    let response = app.read_title(42).await;

    assert!(response.status().is_success());
    let body: ReadTitleResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(body.id, 42);
    assert_eq!(body.title, title.title);
    assert_eq!(body.overview, title.overview);
}

#[tokio::test(flavor = "multi_thread")]
async fn read_missing_title_returns_not_found() {
    init_test_tracing();

    let app = spawn_test_app().await;

    let response = app.read_title(42).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorMessage = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(error.error, "The title with id 42 was not found");
}

#[tokio::test(flavor = "multi_thread")]
async fn update_title_changes_the_catalog_without_announcing() {
    init_test_tracing();

    let app = spawn_test_app().await;
    create_title(&app, 1).await;

    let update = UpdateTitleRequest {
        title: "Alien (Director's Cut)".to_string(),
        overview: "Re-released with restored scenes.".to_string(),
    };
    let response = app.update_title(1, &update).await;

    assert!(response.status().is_success());
    let body: ReadTitleResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(body.title, "Alien (Director's Cut)");

    let response = app.read_title(1).await;
    let body: ReadTitleResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(body.overview, "Re-released with restored scenes.");

    // Only the create was announced.
    assert_eq!(app.publisher.envelopes().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn update_missing_title_returns_not_found() {
    init_test_tracing();

    let app = spawn_test_app().await;

    let update = UpdateTitleRequest {
        title: "Nothing".to_string(),
        overview: String::new(),
    };
    let response = app.update_title(3, &update).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_title_removes_the_title() {
    init_test_tracing();

    let app = spawn_test_app().await;
    create_title(&app, 1).await;

    let response = app.delete_title(1).await;
    assert!(response.status().is_success());

    let response = app.read_title(1).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deletions are not announced.
    assert_eq!(app.publisher.envelopes().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_missing_title_returns_not_found() {
    init_test_tracing();

    let app = spawn_test_app().await;

    let response = app.delete_title(9).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn read_all_titles_returns_titles_ordered_by_id() {
    init_test_tracing();

    let app = spawn_test_app().await;
    create_title(&app, 3).await;
    create_title(&app, 1).await;
    create_title(&app, 2).await;

    let response = app.read_all_titles().await;

    assert!(response.status().is_success());
    let body: ReadTitlesResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    let ids: Vec<i64> = body.titles.iter().map(|title| title.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}
