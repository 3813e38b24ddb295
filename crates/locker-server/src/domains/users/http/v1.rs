use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::put, Extension, Json,
    Router,
};
use locker_core::Identity;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::app::AppState;
use crate::domains::users::service;

#[derive(Deserialize, JsonSchema)]
pub(crate) struct PublicKeyRequest {
    pub(crate) public_key: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/users/me/public-key", put(update_public_key))
}

#[tracing::instrument(skip(state, identity, payload))]
async fn update_public_key(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<PublicKeyRequest>,
) -> impl IntoResponse {
    match service::update_public_key(&state, &identity, &payload.public_key).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
