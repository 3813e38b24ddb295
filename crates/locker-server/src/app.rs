use axum::{extract::DefaultBodyLimit, Extension, Router};
use std::time::Instant;

use crate::config::ServerConfig;
use crate::domains::sync::notifier::SyncNotifier;
use crate::settings::DbTxIsolation;
use locker_db::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub db_tx_isolation: DbTxIsolation,
    pub started_at: Instant,
    pub token_pepper: String,
    pub session_ttl_seconds: i64,
    pub config: ServerConfig,
    pub notifier: SyncNotifier,
}

pub fn build_router(state: AppState) -> Router {
    let extension_state = state.clone();
    let max_body_bytes = state.config.server.max_body_bytes;
    crate::http::router()
        .with_state(state)
        .layer(Extension(extension_state))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}
