use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use domain::models::NotificationPolicy;
use domain::services::{
    ControllerOptions, InMemoryRemoteApi, LoadSource, LocalCache, MockNotificationDispatcher,
    NotificationDispatcher, NotificationGate, Persistence, RemoteSettingsApi, SettingsController,
};
use persistence::{FileCache, HttpNotificationDispatcher, HttpSettingsApi, RemoteConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{health, notifications, settings, templates, versions};

#[derive(Clone)]
pub struct AppState {
    /// Single owner of the live document; one request mutates it at a time.
    pub controller: Arc<Mutex<SettingsController>>,
    pub gate: Arc<NotificationGate>,
    pub config: Arc<Config>,
}

/// Running services behind the router.
pub struct Services {
    pub state: AppState,
    /// Notification gate task; ends once the controller is dropped.
    pub gate_task: JoinHandle<()>,
    pub load_source: LoadSource,
}

/// Wire persistence, the controller and the notification gate, then load
/// the persisted state.
pub async fn init_services(config: Config) -> anyhow::Result<Services> {
    let local: Arc<dyn LocalCache> = Arc::new(FileCache::open(&config.cache.dir).await?);

    let remote_config = RemoteConfig {
        base_url: config.remote.base_url.clone(),
        timeout: config.remote_timeout(),
    };
    let remote: Arc<dyn RemoteSettingsApi> = if config.remote_enabled() {
        info!(base_url = %remote_config.base_url, "Using remote settings API");
        Arc::new(HttpSettingsApi::new(&remote_config)?)
    } else {
        warn!("No remote settings API configured, using in-process store");
        Arc::new(InMemoryRemoteApi::new())
    };

    let dispatcher: Arc<dyn NotificationDispatcher> = if config.notifications.dispatch_enabled {
        Arc::new(HttpNotificationDispatcher::new(&remote_config)?)
    } else {
        info!("Notification dispatch disabled, alerts are logged only");
        Arc::new(MockNotificationDispatcher::new())
    };

    let persistence = Persistence::new(remote, local.clone());
    let gate = Arc::new(
        NotificationGate::new(dispatcher, NotificationPolicy::default()).with_cache(local),
    );
    gate.load_policy().await;

    let options = ControllerOptions {
        autosave_quiet_period: config.autosave_quiet_period(),
        snapshot_on_edit: config.autosave.snapshot_on_edit,
    };
    Ok(start(config, SettingsController::new(persistence, options), gate).await)
}

/// Subscribe the gate to `controller`, load persisted state and build the
/// shared state.
pub async fn start(
    config: Config,
    mut controller: SettingsController,
    gate: Arc<NotificationGate>,
) -> Services {
    let gate_task = gate.clone().spawn(controller.subscribe());
    let load_source = controller.load().await;

    Services {
        state: AppState {
            controller: Arc::new(Mutex::new(controller)),
            gate,
            config: Arc::new(config),
        },
        gate_task,
        load_source,
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let settings_routes = Router::new()
        .route("/api/v1/settings", get(settings::get_settings))
        .route("/api/v1/settings/save", post(settings::save))
        .route("/api/v1/settings/export", get(settings::export))
        .route("/api/v1/settings/import", post(settings::import))
        .route("/api/v1/settings/history", get(settings::history))
        .route("/api/v1/settings/:category/:field", put(settings::update_field))
        .route(
            "/api/v1/settings/:category/:field/validate",
            post(settings::validate_field),
        )
        .route(
            "/api/v1/categories/:category/enabled",
            put(settings::set_category_enabled),
        );

    let version_routes = Router::new()
        .route(
            "/api/v1/versions",
            get(versions::list_versions).post(versions::create_version),
        )
        .route(
            "/api/v1/versions/rollback",
            axum::routing::delete(versions::cancel_rollback),
        )
        .route(
            "/api/v1/versions/:id",
            get(versions::get_version).delete(versions::delete_version),
        )
        .route("/api/v1/versions/:id/diff", get(versions::diff_version))
        .route("/api/v1/versions/:id/rollback", post(versions::rollback));

    let template_routes = Router::new()
        .route("/api/v1/templates", get(templates::list_templates))
        .route(
            "/api/v1/templates/:name/preview",
            get(templates::preview_template),
        )
        .route(
            "/api/v1/templates/:name/apply",
            post(templates::apply_template),
        );

    let notification_routes = Router::new().route(
        "/api/v1/notifications/policy",
        get(notifications::get_policy).put(notifications::update_policy),
    );

    // Public routes (probes and metrics)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(settings_routes)
        .merge(version_routes)
        .merge(template_routes)
        .merge(notification_routes)
        // Global middleware (bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .with_state(state)
}
