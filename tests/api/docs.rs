use crate::utils::spawn_app;
use http::{
    header::{ACCEPT, CONTENT_TYPE},
    StatusCode,
};
use rstest::rstest;

#[rstest]
#[case("/docs/openapi.json", None, "application/json")]
#[case("/docs/openapi.yaml", None, "application/yaml")]
#[case("/docs/openapi", Some("application/yaml"), "application/yaml")]
#[case("/docs/openapi", Some("application/json"), "application/json")]
#[case("/docs/openapi", None, "application/json")]
#[tokio::test]
async fn open_api_documentation_is_served_in_the_requested_format(
    #[case] path: &str,
    #[case] accept: Option<&str>,
    #[case] expected_content_type: &str,
) {
    // Arrange
    let app = spawn_app().await;
    let mut request = app.api_client().get(app.at_url(path));
    if let Some(accept) = accept {
        request = request.header(ACCEPT, accept);
    }

    // Act
    let response = request.send().await.expect("Request failed");

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|x| x.to_str().ok()),
        Some(expected_content_type)
    );
    assert!(!response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn open_api_documentation_lists_the_public_endpoints() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let docs: serde_json::Value = app
        .get("/docs/openapi.json")
        .await
        .json()
        .await
        .expect("Documentation was not valid JSON");

    // Assert
    for path in [
        "/",
        "/api/hello",
        "/test",
        "/api/contact",
        "/api/contact/health",
        "/health",
        "/metrics",
    ] {
        assert!(
            docs["paths"].get(path).is_some(),
            "Documentation is missing the path {path}"
        );
    }
}
