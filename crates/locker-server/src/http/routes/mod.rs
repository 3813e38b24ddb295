use crate::app::AppState;
use axum::Router;

pub(crate) mod health;
pub mod v1;

pub fn router() -> Router<AppState> {
    Router::new().merge(health::router()).merge(v1::router())
}
