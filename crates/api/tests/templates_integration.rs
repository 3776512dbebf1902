//! Integration tests for settings templates.

mod common;

use axum::http::{Method, StatusCode};
use common::{get_request, json_request, parse_response_body, TestApp};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_list_builtin_templates() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(get_request("/api/v1/templates"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["development", "production", "staging"]);
}

#[tokio::test]
async fn test_preview_template_does_not_apply() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(get_request("/api/v1/templates/production/preview"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["canApply"], true);
    assert!(body["summary"]["modified"].as_u64().unwrap() > 0);

    let controller = app.state.controller.lock().await;
    assert_eq!(controller.document().get("system", "maxUsers"), Some(&json!(500)));
}

#[tokio::test]
async fn test_apply_template_overlays_current_document() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/templates/production/apply",
            json!({}),
            Some("ops@example.com"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert!(body["applied"].as_u64().unwrap() > 0);
    assert!(body["snapshot"]["id"].is_i64());
    assert_eq!(body["warnings"], json!([]));

    let controller = app.state.controller.lock().await;
    let document = controller.document();
    assert_eq!(document.get("system", "maxUsers"), Some(&json!(10000)));
    assert_eq!(document.get("security", "passwordMinLength"), Some(&json!(12)));
    // Untouched by the template
    assert_eq!(document.get("maps", "defaultZoom"), Some(&json!(12)));
    assert!(controller
        .history()
        .iter()
        .all(|r| r.action == domain::models::ChangeAction::TemplateApplied));
}

#[tokio::test]
async fn test_reapplying_template_is_a_no_op() {
    let app = TestApp::new().await;

    for expected_snapshot in [true, false] {
        let body = parse_response_body(
            app.router()
                .oneshot(json_request(
                    Method::POST,
                    "/api/v1/templates/staging/apply",
                    json!({}),
                    None,
                ))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["snapshot"].is_object(), expected_snapshot);
    }

    let controller = app.state.controller.lock().await;
    assert_eq!(controller.versions().len(), 1);
}

#[tokio::test]
async fn test_unknown_template_not_found() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(get_request("/api/v1/templates/qa/preview"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/templates/qa/apply",
            json!({}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
