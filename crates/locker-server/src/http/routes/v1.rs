use crate::app::AppState;
use axum::{middleware, Router};

pub fn router() -> Router<AppState> {
    // Everything below requires a session token.
    let protected = Router::new()
        .merge(crate::domains::ciphers::http::v1::router())
        .merge(crate::domains::folders::http::v1::router())
        .merge(crate::domains::sharing::http::v1::router())
        .merge(crate::domains::groups::http::v1::router())
        .merge(crate::domains::devices::http::v1::router())
        .merge(crate::domains::users::http::v1::router())
        .merge(crate::domains::sync::http::v1::router())
        .layer(middleware::from_fn(crate::domains::auth::auth_middleware));

    Router::new()
        .merge(crate::domains::system::http::v1::router())
        .merge(protected)
}
