use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use schemars::JsonSchema;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::app::AppState;

#[derive(Serialize, JsonSchema)]
pub(crate) struct SystemInfoResponse {
    pub(crate) version: &'static str,
    pub(crate) build_commit: Option<&'static str>,
    pub(crate) server_name: Option<String>,
    pub(crate) server_fingerprint: String,
    pub(crate) push_enabled: bool,
    pub(crate) email_invites_enabled: bool,
    pub(crate) max_invitations_per_request: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/system/info", get(info))
}

async fn info(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(system_info(&state)))
}

fn system_info(state: &AppState) -> SystemInfoResponse {
    let mut hasher = Sha256::new();
    hasher.update(state.token_pepper.as_bytes());
    SystemInfoResponse {
        version: env!("CARGO_PKG_VERSION"),
        build_commit: option_env!("GIT_COMMIT"),
        server_name: state.config.server.name.clone(),
        server_fingerprint: format!("sha256:{}", hex::encode(hasher.finalize())),
        push_enabled: state.config.sync.push.enabled,
        email_invites_enabled: state.config.sharing.allow_email_invites,
        max_invitations_per_request: state.config.sharing.max_invitations_per_request,
    }
}
