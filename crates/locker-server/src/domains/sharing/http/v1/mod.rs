use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app::AppState;

mod handlers;
pub(crate) mod types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sharing", get(handlers::list_shares))
        .route("/v1/sharing/ciphers", post(handlers::share_cipher))
        .route("/v1/sharing/folders", post(handlers::share_folder))
        .route("/v1/sharing/invitations", get(handlers::list_invitations))
        .route(
            "/v1/sharing/invitations/:member_id",
            post(handlers::respond_invitation),
        )
        .route("/v1/sharing/:team_id/members", post(handlers::add_members))
        .route(
            "/v1/sharing/:team_id/members/:member_id",
            put(handlers::update_member).delete(handlers::remove_member),
        )
        .route(
            "/v1/sharing/:team_id/members/:member_id/public-key",
            get(handlers::member_public_key),
        )
        .route(
            "/v1/sharing/:team_id/members/:member_id/confirm",
            post(handlers::confirm_member),
        )
        .route("/v1/sharing/:team_id/leave", post(handlers::leave_team))
        .route("/v1/sharing/:team_id/stop", post(handlers::stop_sharing))
        .route(
            "/v1/sharing/:team_id/collections/:collection_id/ciphers",
            post(handlers::add_cipher_to_share),
        )
}
