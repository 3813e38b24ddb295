use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{middleware, Router};
use chrono::Utc;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use prometheus::Encoder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::app::{self, AppState};
use crate::config::MetricsConfig;
use crate::domains::sync::fcm::FcmGateway;
use crate::domains::sync::notifier::{PushGateway, SyncNotifier};
use crate::infra::metrics;
use crate::runtime;
use crate::settings;
use locker_db::repo::SessionRepo;
use locker_db::{connect_postgres_with_max, PgPool};

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|key| key.as_str()).collect()
    }
}

pub fn init_sentry(settings: &settings::Settings) -> Option<sentry::ClientInitGuard> {
    let sentry_enabled = settings.config.sentry.enabled && !settings.config.sentry.dsn.is_empty();
    if !sentry_enabled {
        return None;
    }
    let environment = settings.config.sentry.environment.clone();
    let release = settings.config.sentry.release.clone();
    Some(sentry::init((
        settings.config.sentry.dsn.as_str(),
        sentry::ClientOptions {
            environment: environment.map(Into::into),
            release: release.map(Into::into),
            ..Default::default()
        },
    )))
}

#[allow(dead_code)]
pub(crate) fn init_tracing(
    sentry_enabled: bool,
    settings: &settings::Settings,
) -> Option<runtime::OtelGuard> {
    runtime::init_tracing(sentry_enabled, settings)
}

pub fn log_startup(settings: &settings::Settings, metrics_config: &MetricsConfig) {
    let metrics_profile = metrics_config.effective_profile();
    if settings.config.server.trusted_proxies.is_empty() {
        tracing::warn!(
            event = "trusted_proxies_empty",
            "Forwarded headers are ignored; client IPs rely on direct peer address"
        );
    }
    tracing::info!(
        event = "server_startup",
        addr = %settings.addr,
        db_tx_isolation = ?settings.db_tx_isolation,
        session_ttl_seconds = settings.session_ttl_seconds,
        otel_enabled = settings.config.tracing.otel.enabled,
        metrics_enabled = metrics_config.enabled,
        metrics_profile = ?metrics_profile,
        server_name = ?settings.config.server.name,
        push_enabled = settings.config.sync.push.enabled,
        allow_email_invites = settings.config.sharing.allow_email_invites,
        max_invitations_per_request = settings.config.sharing.max_invitations_per_request,
        "Server configuration loaded"
    );
    if metrics_config.enabled && metrics_profile != crate::config::MetricsProfile::Prod {
        tracing::warn!(
            event = "metrics_profile_non_prod",
            profile = ?metrics_profile,
            "Non-prod metrics profile enabled"
        );
    }
}

pub fn init_metrics_registry(metrics_config: &MetricsConfig) {
    metrics::set_profile(metrics_config.effective_profile());
    if !metrics_config.enabled {
        return;
    }
    #[cfg(target_os = "linux")]
    {
        let process_collector = prometheus::process_collector::ProcessCollector::for_self();
        if prometheus::default_registry()
            .register(Box::new(process_collector))
            .is_err()
        {
            tracing::warn!("failed to register process metrics");
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        tracing::warn!("process metrics are only available on linux");
    }
}

pub async fn connect_db(settings: &settings::Settings) -> Result<PgPool, sqlx_core::Error> {
    connect_postgres_with_max(&settings.db_url, settings.db_pool_max).await
}

pub fn build_notifier(settings: &settings::Settings, db: PgPool) -> SyncNotifier {
    let push = &settings.config.sync.push;
    let gateway: Option<Arc<dyn PushGateway>> = if push.enabled {
        match settings.fcm_server_key.clone() {
            Some(server_key) => match FcmGateway::new(push, server_key) {
                Ok(gateway) => Some(Arc::new(gateway)),
                Err(err) => {
                    tracing::error!(event = "push_gateway_init_failed", error = %err);
                    None
                }
            },
            None => {
                tracing::warn!(
                    event = "push_gateway_disabled",
                    "Push enabled without an FCM server key"
                );
                None
            }
        }
    } else {
        None
    };
    SyncNotifier::new(db, settings.config.sync.event_channel_capacity, gateway)
}

pub fn build_state(settings: &settings::Settings, db: PgPool) -> AppState {
    let notifier = build_notifier(settings, db.clone());
    AppState {
        db,
        db_tx_isolation: settings.db_tx_isolation,
        started_at: Instant::now(),
        token_pepper: settings.token_pepper.clone(),
        session_ttl_seconds: settings.session_ttl_seconds,
        config: settings.config.clone(),
        notifier,
    }
}

pub fn start_background_tasks(settings: &settings::Settings, state: &AppState) {
    {
        let pool = state.db.clone();
        tokio::spawn(async move {
            let interval = Duration::from_secs(3600);
            loop {
                match SessionRepo::new(&pool).delete_expired(Utc::now()).await {
                    Ok(count) => {
                        if count > 0 {
                            tracing::info!(event = "sessions_pruned", deleted = count);
                        }
                    }
                    Err(err) => {
                        tracing::error!(event = "sessions_prune_failed", error = %err);
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
    if settings.config.metrics.enabled {
        metrics::start_db_pool_metrics(state.db.clone(), settings.db_pool_max);
    }
}

pub fn build_app(metrics_config: &MetricsConfig, state: AppState) -> Router {
    let request_id_header = axum::http::HeaderName::from_static("x-request-id");
    let mut app = app::build_router(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("unknown");
                let matched = request
                    .extensions()
                    .get::<axum::extract::MatchedPath>()
                    .map(axum::extract::MatchedPath::as_str)
                    .unwrap_or("unmatched");
                let span = tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %matched,
                    request_id = %request_id,
                    user_id = tracing::field::Empty
                );
                let parent = global::get_text_map_propagator(|prop| {
                    prop.extract(&HeaderExtractor(request.headers()))
                });
                span.set_parent(parent);
                span
            }),
        )
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(CatchPanicLayer::custom(|err| {
            tracing::error!(event = "panic_recovered", error = ?err, "handler panicked");
            match axum::response::Response::builder()
                .status(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
                .body(axum::body::Body::empty())
            {
                Ok(response) => response,
                Err(err) => {
                    tracing::error!(event = "panic_response_failed", error = %err);
                    axum::response::Response::new(axum::body::Body::empty())
                }
            }
        }));
    if metrics_config.enabled {
        app = app.route_layer(middleware::from_fn(metrics::http_metrics));
        let (layer, handle) = axum_prometheus::PrometheusMetricLayer::pair();
        let path = metrics_config.endpoint.clone();
        app = app.layer(layer).route(
            &path,
            axum::routing::get(move || async move {
                let mut body = handle.render();
                let encoder = prometheus::TextEncoder::new();
                let metric_families = prometheus::gather();
                let mut buffer = Vec::new();
                if encoder.encode(&metric_families, &mut buffer).is_ok() && !buffer.is_empty() {
                    body.push('\n');
                    body.push_str(&String::from_utf8_lossy(&buffer));
                }

                let content_type = encoder.format_type().to_string();
                let mut response = axum::response::Response::new(axum::body::Body::from(body));
                if let Ok(value) = axum::http::HeaderValue::from_str(&content_type) {
                    response
                        .headers_mut()
                        .insert(axum::http::header::CONTENT_TYPE, value);
                }
                response
            }),
        );
    }
    app
}

pub async fn serve(settings: &settings::Settings, app: Router) {
    let addr: SocketAddr = settings.addr;
    tracing::info!(%addr, "listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(event = "server_bind_failed", error = %err);
            return;
        }
    };
    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(runtime::shutdown_signal())
    .await
    {
        tracing::error!(event = "server_failed", error = %err);
    }
}
