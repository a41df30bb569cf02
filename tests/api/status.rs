use crate::utils::{spawn_app, spawn_app_with, Mailer, RecordingStore, RecordingTransport};
use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("/", "Hello from the portfolio backend!")]
#[case("/api/hello", "Hello from the backend API!")]
#[tokio::test]
async fn greeting_endpoints_return_a_message(#[case] path: String, #[case] message: String) {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get(&path).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], message.as_str());
}

fn database_settings() -> Vec<(&'static str, String)> {
    vec![
        ("database_url", "mongodb://127.0.0.1:27017".to_string()),
        ("database_name", "portfolio".to_string()),
    ]
}

#[tokio::test]
async fn status_report_without_a_database_still_answers() {
    // Arrange
    let app = spawn_app_with(
        vec![],
        None,
        Mailer::Recording(RecordingTransport::default()),
    )
    .await;

    // Act
    let response = app.get("/test").await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["backend"], "✅ Running");
    assert!(body["database"].as_str().unwrap().starts_with("❌"));
    assert_eq!(body["connection_status"], "Not Connected");
    assert_eq!(body["database_url"], "❌ Not Set");
    assert_eq!(body["database_name"], "❌ Not Set");
    assert_eq!(body["collections"], serde_json::json!([]));
}

#[tokio::test]
async fn status_report_lists_at_most_ten_collections() {
    // Arrange
    let app = spawn_app_with(
        database_settings(),
        Some(RecordingStore::with_collections(12)),
        Mailer::Recording(RecordingTransport::default()),
    )
    .await;

    // Act
    let response = app.get("/test").await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["database"], "✅ Connected & Working");
    assert_eq!(body["connection_status"], "Connected");
    assert_eq!(body["database_url"], "✅ Set");
    assert_eq!(body["database_name"], "✅ Set");
    assert_eq!(body["collections"].as_array().unwrap().len(), 10);
    assert_eq!(body["collections"][0], "collection_0");
}

#[tokio::test]
async fn status_report_turns_store_errors_into_a_status_string() {
    // Arrange
    let app = spawn_app_with(
        database_settings(),
        Some(RecordingStore::failing()),
        Mailer::Recording(RecordingTransport::default()),
    )
    .await;

    // Act
    let response = app.get("/test").await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    let database = body["database"].as_str().unwrap();
    assert!(database.starts_with("⚠️  Connected but Error: "));
    let reason = database.trim_start_matches("⚠️  Connected but Error: ");
    assert!(reason.chars().count() <= 50);
    assert_eq!(body["collections"], serde_json::json!([]));
}
