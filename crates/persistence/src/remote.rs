//! HTTP clients for the remote settings API and notification endpoint.

use std::time::Duration;

use domain::models::{NotificationPayload, SettingsDocument, VersionId, VersionSnapshot};
use domain::services::{DispatchResult, NotificationDispatcher, RemoteSettingsApi};
use domain::PersistenceError;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::metrics::RemoteCallTimer;

/// Default request timeout for remote calls.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the remote API.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client, PersistenceError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PersistenceError::Remote(format!("Failed to create HTTP client: {}", e)))
}

fn remote_error(err: reqwest::Error) -> PersistenceError {
    PersistenceError::Remote(err.to_string())
}

/// Send a request, timing it and treating non-2xx responses as failures.
async fn execute(
    operation: &'static str,
    request: RequestBuilder,
) -> Result<Response, PersistenceError> {
    let timer = RemoteCallTimer::new(operation);
    let result = match request.send().await {
        Ok(response) => response.error_for_status().map_err(remote_error),
        Err(e) => Err(remote_error(e)),
    };
    timer.finish(result.is_ok());

    match &result {
        Ok(response) => debug!(operation, status = %response.status(), "Remote call completed"),
        Err(e) => warn!(operation, error = %e, "Remote call failed"),
    }
    result
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RollbackNotice {
    version_id: VersionId,
}

/// Remote settings API over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpSettingsApi {
    client: Client,
    base_url: String,
}

impl HttpSettingsApi {
    pub fn new(config: &RemoteConfig) -> Result<Self, PersistenceError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl RemoteSettingsApi for HttpSettingsApi {
    async fn fetch_settings(&self) -> Result<SettingsDocument, PersistenceError> {
        let response = execute("fetch_settings", self.client.get(self.url("settings"))).await?;
        let value: Value = response.json().await.map_err(remote_error)?;
        SettingsDocument::from_value(value)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))
    }

    async fn store_settings(&self, document: &SettingsDocument) -> Result<(), PersistenceError> {
        execute(
            "store_settings",
            self.client.put(self.url("settings")).json(document),
        )
        .await?;
        Ok(())
    }

    async fn fetch_versions(&self) -> Result<Vec<VersionSnapshot>, PersistenceError> {
        let response = execute("fetch_versions", self.client.get(self.url("versions"))).await?;
        response.json().await.map_err(remote_error)
    }

    async fn store_version(&self, snapshot: &VersionSnapshot) -> Result<(), PersistenceError> {
        execute(
            "store_version",
            self.client.post(self.url("versions")).json(snapshot),
        )
        .await?;
        Ok(())
    }

    async fn delete_version(&self, id: VersionId) -> Result<(), PersistenceError> {
        execute(
            "delete_version",
            self.client.delete(self.url(&format!("versions/{}", id))),
        )
        .await?;
        Ok(())
    }

    async fn record_rollback(&self, id: VersionId) -> Result<(), PersistenceError> {
        execute(
            "record_rollback",
            self.client
                .post(self.url("rollback"))
                .json(&RollbackNotice { version_id: id }),
        )
        .await?;
        Ok(())
    }
}

/// Sends notification payloads to `POST notifications/send`.
#[derive(Debug, Clone)]
pub struct HttpNotificationDispatcher {
    client: Client,
    endpoint: String,
}

impl HttpNotificationDispatcher {
    pub fn new(config: &RemoteConfig) -> Result<Self, PersistenceError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            endpoint: format!("{}/notifications/send", config.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn send(&self, payload: &NotificationPayload) -> DispatchResult {
        match execute(
            "send_notification",
            self.client.post(&self.endpoint).json(payload),
        )
        .await
        {
            Ok(_) => DispatchResult::Sent,
            Err(e) => DispatchResult::Failed(e.to_string()),
        }
    }
}
