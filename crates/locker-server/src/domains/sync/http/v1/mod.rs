use axum::{routing::get, Router};

use crate::app::AppState;

mod handlers;
pub(crate) mod types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sync", get(handlers::sync))
        .route("/v1/sync/revision", get(handlers::revision))
        .route("/v1/sync/events", get(handlers::events))
}
