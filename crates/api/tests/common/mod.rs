//! Common test utilities for integration tests.
//!
//! The app runs against in-memory persistence and a mock dispatcher, so no
//! external services are needed.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use domain::models::{NotificationPayload, NotificationPolicy};
use domain::services::{
    ControllerOptions, InMemoryCache, InMemoryRemoteApi, MockNotificationDispatcher,
    NotificationGate, Persistence, SettingsController,
};
use settings_admin_api::{
    app::{create_app, start, AppState},
    config::Config,
    extractors::ACTOR_HEADER,
};
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub state: AppState,
    pub remote: Arc<InMemoryRemoteApi>,
    pub cache: Arc<InMemoryCache>,
    pub dispatcher: MockNotificationDispatcher,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_policy(NotificationPolicy::default()).await
    }

    pub async fn with_policy(policy: NotificationPolicy) -> Self {
        let config = test_config();
        let (persistence, remote, cache) = Persistence::in_memory();
        let dispatcher = MockNotificationDispatcher::new();
        let gate = Arc::new(
            NotificationGate::new(Arc::new(dispatcher.clone()), policy).with_cache(cache.clone()),
        );
        let options = ControllerOptions {
            autosave_quiet_period: config.autosave_quiet_period(),
            snapshot_on_edit: config.autosave.snapshot_on_edit,
        };
        let controller = SettingsController::new(persistence, options);
        let services = start(config, controller, gate).await;

        Self {
            state: services.state,
            remote,
            cache,
            dispatcher,
        }
    }

    /// Fresh router over the shared state; `oneshot` consumes it.
    pub fn router(&self) -> Router {
        create_app(self.state.clone())
    }

    /// Wait for the gate task to deliver `count` notifications.
    pub async fn wait_for_notifications(&self, count: usize) -> Vec<NotificationPayload> {
        for _ in 0..50 {
            let sent = self.dispatcher.sent().await;
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.dispatcher.sent().await
    }
}

/// Test configuration; auto-save is pushed out of the way.
pub fn test_config() -> Config {
    Config::load_for_test(&[("autosave.quiet_period_ms", "60000")])
        .expect("Failed to load test config")
}

/// Build a JSON request, optionally naming the actor.
pub fn json_request(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    actor: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a request with a raw text body.
pub fn raw_request(method: Method, uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Build a GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a DELETE request.
pub fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Parse response body as JSON.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
