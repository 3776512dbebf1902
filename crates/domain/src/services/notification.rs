//! Notification gate for committed settings changes.
//!
//! The controller publishes [`SettingsEvent::Committed`] for every committed
//! field change. The gate consumes those events on its own task, evaluates
//! the policy and hands emitted payloads to a [`NotificationDispatcher`].
//! Dispatch failures are logged and never reach the operator.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use validator::Validate;

use crate::error::SettingsError;
use crate::models::{ChangeRecord, FieldError, NotificationPayload, NotificationPolicy};
use crate::services::persistence::{cache_keys, LocalCache};

/// Settings whose changes are always eligible for an alert.
pub const CRITICAL_SETTINGS: &[(&str, &str)] = &[
    ("security", "twoFactorAuth"),
    ("security", "sessionTimeout"),
    ("security", "passwordMinLength"),
    ("security", "maxLoginAttempts"),
    ("security", "ipWhitelist"),
    ("system", "maintenanceMode"),
    ("system", "debugMode"),
    ("system", "apiRateLimit"),
    ("backup", "autoBackup"),
    ("integrations", "webhookUrl"),
];

/// Whether a (category, field) pair is in the critical registry.
pub fn is_critical(category: &str, field: &str) -> bool {
    CRITICAL_SETTINGS
        .iter()
        .any(|(c, f)| *c == category && *f == field)
}

/// Message published by the controller after a change is committed.
#[derive(Debug, Clone)]
pub enum SettingsEvent {
    Committed(ChangeRecord),
}

/// Why a change did not produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    Disabled,
    CategoryNotMonitored,
    NotCritical,
}

impl std::fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressReason::Disabled => write!(f, "disabled"),
            SuppressReason::CategoryNotMonitored => write!(f, "category_not_monitored"),
            SuppressReason::NotCritical => write!(f, "not_critical"),
        }
    }
}

/// Outcome of evaluating one change against the policy.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Emit(NotificationPayload),
    Suppress(SuppressReason),
}

/// Decide whether `record` produces a notification under `policy`.
pub fn evaluate(record: &ChangeRecord, policy: &NotificationPolicy) -> GateDecision {
    if !policy.enabled {
        return GateDecision::Suppress(SuppressReason::Disabled);
    }
    if !policy.monitored_categories.contains(&record.category) {
        return GateDecision::Suppress(SuppressReason::CategoryNotMonitored);
    }

    let critical = is_critical(&record.category, &record.field);
    if policy.critical_only && !critical {
        return GateDecision::Suppress(SuppressReason::NotCritical);
    }

    GateDecision::Emit(NotificationPayload {
        recipients: policy.recipients.iter().cloned().collect(),
        category: record.category.clone(),
        field: record.field.clone(),
        action: record.action,
        critical,
        timestamp: record.timestamp,
        old_value: record
            .old_value
            .clone()
            .filter(|_| policy.include_old_value),
        new_value: record
            .new_value
            .clone()
            .filter(|_| policy.include_new_value),
        actor: record.actor.clone().filter(|_| policy.include_actor_info),
    })
}

/// Result of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Sent,
    Failed(String),
}

/// Side channel that delivers notification payloads.
#[async_trait::async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, payload: &NotificationPayload) -> DispatchResult;
}

/// Dispatcher that records payloads instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationDispatcher {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    sent: Arc<Mutex<Vec<NotificationPayload>>>,
}

impl MockNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Payloads accepted so far.
    pub async fn sent(&self) -> Vec<NotificationPayload> {
        self.sent.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for MockNotificationDispatcher {
    async fn send(&self, payload: &NotificationPayload) -> DispatchResult {
        if self.simulate_failure {
            tracing::warn!(
                category = %payload.category,
                field = %payload.field,
                "Mock dispatcher simulating failure"
            );
            return DispatchResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            category = %payload.category,
            field = %payload.field,
            recipients = payload.recipients.len(),
            "Mock: Would send settings notification"
        );
        self.sent.lock().await.push(payload.clone());
        DispatchResult::Sent
    }
}

/// Owns the notification policy and delivers emitted payloads.
pub struct NotificationGate {
    policy: RwLock<NotificationPolicy>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    cache: Option<Arc<dyn LocalCache>>,
}

impl NotificationGate {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>, policy: NotificationPolicy) -> Self {
        Self {
            policy: RwLock::new(policy),
            dispatcher,
            cache: None,
        }
    }

    /// Persist policy updates through `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn LocalCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn policy(&self) -> NotificationPolicy {
        self.policy.read().await.clone()
    }

    /// Replace the policy after validating it.
    ///
    /// Returns a warning when the policy could not be persisted.
    pub async fn update_policy(
        &self,
        policy: NotificationPolicy,
    ) -> Result<Option<String>, SettingsError> {
        policy.validate().map_err(|errors| SettingsError::Validation {
            errors: policy_field_errors(&errors),
        })?;

        let warning = match &self.cache {
            Some(cache) => match serde_json::to_value(&policy) {
                Ok(value) => cache
                    .write(cache_keys::NOTIFICATION_POLICY, value)
                    .await
                    .err()
                    .map(|e| e.to_string()),
                Err(e) => Some(e.to_string()),
            },
            None => None,
        };
        if let Some(warning) = &warning {
            tracing::warn!(warning = %warning, "Notification policy not persisted");
        }

        *self.policy.write().await = policy;
        tracing::info!("Notification policy updated");
        Ok(warning)
    }

    /// Restore a previously persisted policy, keeping the current one if absent.
    pub async fn load_policy(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        match cache.read(cache_keys::NOTIFICATION_POLICY).await {
            Ok(Some(value)) => match serde_json::from_value::<NotificationPolicy>(value) {
                Ok(policy) => *self.policy.write().await = policy,
                Err(e) => tracing::warn!(error = %e, "Ignoring malformed notification policy"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read notification policy"),
        }
    }

    /// Evaluate one committed change and dispatch it when emitted.
    ///
    /// Returns the dispatch result, or `None` when the change was suppressed.
    pub async fn handle(&self, record: &ChangeRecord) -> Option<DispatchResult> {
        let decision = {
            let policy = self.policy.read().await;
            evaluate(record, &policy)
        };

        match decision {
            GateDecision::Suppress(reason) => {
                tracing::debug!(
                    field = %record.qualified_field(),
                    reason = %reason,
                    "Notification suppressed"
                );
                None
            }
            GateDecision::Emit(payload) => {
                let result = self.dispatcher.send(&payload).await;
                match &result {
                    DispatchResult::Sent => tracing::info!(
                        field = %record.qualified_field(),
                        recipients = payload.recipients.len(),
                        "Settings change notification sent"
                    ),
                    DispatchResult::Failed(reason) => tracing::warn!(
                        field = %record.qualified_field(),
                        reason = %reason,
                        "Settings change notification failed"
                    ),
                }
                Some(result)
            }
        }
    }

    /// Consume controller events until every sender is dropped.
    pub fn spawn(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<SettingsEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Notification gate started");
            while let Some(event) = events.recv().await {
                match event {
                    SettingsEvent::Committed(record) => {
                        self.handle(&record).await;
                    }
                }
            }
            tracing::info!("Notification gate stopped");
        })
    }
}

fn policy_field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                category: "notificationPolicy".to_string(),
                field: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeAction;
    use crate::services::persistence::InMemoryCache;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn record(category: &str, field: &str) -> ChangeRecord {
        ChangeRecord::new(
            category,
            field,
            Some(json!(false)),
            Some(json!(true)),
            ChangeAction::Modified,
        )
        .with_actor(Some("admin@example.com".to_string()))
    }

    fn security_policy() -> NotificationPolicy {
        NotificationPolicy {
            enabled: true,
            critical_only: true,
            monitored_categories: ["security".to_string()].into_iter().collect(),
            ..NotificationPolicy::default()
        }
    }

    #[test]
    fn test_policy_example() {
        let policy = security_policy();
        assert!(matches!(
            evaluate(&record("security", "twoFactorAuth"), &policy),
            GateDecision::Emit(_)
        ));
        assert_eq!(
            evaluate(&record("notifications", "pushEnabled"), &policy),
            GateDecision::Suppress(SuppressReason::CategoryNotMonitored)
        );
    }

    #[test]
    fn test_disabled_policy_suppresses_everything() {
        let policy = NotificationPolicy {
            enabled: false,
            ..security_policy()
        };
        assert_eq!(
            evaluate(&record("security", "twoFactorAuth"), &policy),
            GateDecision::Suppress(SuppressReason::Disabled)
        );
    }

    #[test]
    fn test_critical_only_filters_non_critical() {
        let policy = security_policy();
        assert_eq!(
            evaluate(&record("security", "lockoutDuration"), &policy),
            GateDecision::Suppress(SuppressReason::NotCritical)
        );

        let relaxed = NotificationPolicy {
            critical_only: false,
            ..security_policy()
        };
        match evaluate(&record("security", "lockoutDuration"), &relaxed) {
            GateDecision::Emit(payload) => assert!(!payload.critical),
            other => panic!("expected emit, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_redaction() {
        let policy = NotificationPolicy {
            include_old_value: false,
            include_actor_info: false,
            recipients: ["ops@example.com".to_string()].into_iter().collect(),
            ..security_policy()
        };
        let GateDecision::Emit(payload) = evaluate(&record("security", "twoFactorAuth"), &policy)
        else {
            panic!("expected emit");
        };
        assert!(payload.critical);
        assert_eq!(payload.old_value, None);
        assert_eq!(payload.new_value, Some(json!(true)));
        assert_eq!(payload.actor, None);
        assert_eq!(payload.recipients, vec!["ops@example.com".to_string()]);
    }

    #[test]
    fn test_critical_registry() {
        assert!(is_critical("system", "maintenanceMode"));
        assert!(is_critical("integrations", "webhookUrl"));
        assert!(!is_critical("notifications", "pushEnabled"));
        assert!(!is_critical("security", "unknown"));
    }

    #[tokio::test]
    async fn test_handle_dispatches_emitted() {
        let dispatcher = MockNotificationDispatcher::new();
        let gate = NotificationGate::new(Arc::new(dispatcher.clone()), security_policy());

        assert_eq!(
            gate.handle(&record("security", "twoFactorAuth")).await,
            Some(DispatchResult::Sent)
        );
        assert_eq!(gate.handle(&record("notifications", "pushEnabled")).await, None);
        assert_eq!(dispatcher.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_handle_swallows_dispatch_failure() {
        let gate = NotificationGate::new(
            Arc::new(MockNotificationDispatcher::failing()),
            security_policy(),
        );
        let result = gate.handle(&record("security", "twoFactorAuth")).await;
        assert!(matches!(result, Some(DispatchResult::Failed(_))));
    }

    #[tokio::test]
    async fn test_spawned_gate_consumes_events() {
        let dispatcher = MockNotificationDispatcher::new();
        let gate = Arc::new(NotificationGate::new(
            Arc::new(dispatcher.clone()),
            security_policy(),
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = gate.spawn(rx);

        tx.send(SettingsEvent::Committed(record("security", "sessionTimeout")))
            .unwrap();
        tx.send(SettingsEvent::Committed(record("system", "maxUsers")))
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        let sent = dispatcher.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].field, "sessionTimeout");
    }

    #[tokio::test]
    async fn test_update_policy_validates_and_persists() {
        let cache = Arc::new(InMemoryCache::new());
        let gate = NotificationGate::new(
            Arc::new(MockNotificationDispatcher::new()),
            NotificationPolicy::default(),
        )
        .with_cache(cache.clone());

        let bad = NotificationPolicy {
            recipients: ["nope".to_string()].into_iter().collect(),
            ..NotificationPolicy::default()
        };
        let err = gate.update_policy(bad).await.unwrap_err();
        assert!(matches!(err, SettingsError::Validation { .. }));
        assert!(!gate.policy().await.enabled);

        let warning = gate.update_policy(security_policy()).await.unwrap();
        assert!(warning.is_none());

        let restored = NotificationGate::new(
            Arc::new(MockNotificationDispatcher::new()),
            NotificationPolicy::default(),
        )
        .with_cache(cache);
        restored.load_policy().await;
        let policy = restored.policy().await;
        assert!(policy.enabled);
        assert_eq!(
            policy.monitored_categories,
            ["security".to_string()].into_iter().collect::<BTreeSet<_>>()
        );
    }

    #[tokio::test]
    async fn test_update_policy_reports_cache_failure() {
        let cache = Arc::new(InMemoryCache::new());
        cache.set_failing(true);
        let gate = NotificationGate::new(
            Arc::new(MockNotificationDispatcher::new()),
            NotificationPolicy::default(),
        )
        .with_cache(cache);

        let warning = gate.update_policy(security_policy()).await.unwrap();
        assert!(warning.is_some());
        assert!(gate.policy().await.enabled);
    }
}
