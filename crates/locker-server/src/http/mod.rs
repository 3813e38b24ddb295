use axum::Router;

use crate::app::AppState;

pub mod openapi;
pub mod routes;

pub fn router() -> Router<AppState> {
    routes::router()
}
