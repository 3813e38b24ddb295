use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use locker_core::Identity;
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::sharing::service::{self, UpdateMemberCommand};

use super::super::types::{
    AddMembersRequest, ConfirmMemberRequest, MemberResponse, PublicKeyResponse, UpdateMemberRequest,
};
use super::shares::share_response;

#[tracing::instrument(skip(state, identity, payload), fields(team_id = %team_id))]
pub(crate) async fn add_members(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_id): Path<Uuid>,
    Json(payload): Json<AddMembersRequest>,
) -> impl IntoResponse {
    match service::add_members(&state, &identity, team_id, payload.members, payload.groups).await
    {
        Ok(result) => (StatusCode::OK, Json(share_response(result))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(team_id = %team_id, member_id = %member_id))]
pub(crate) async fn update_member(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMemberRequest>,
) -> impl IntoResponse {
    let cmd = UpdateMemberCommand {
        team_id,
        member_id,
        role: payload.role,
        hide_passwords: payload.hide_passwords,
    };
    match service::update_member(&state, &identity, cmd).await {
        Ok(member) => (StatusCode::OK, Json(MemberResponse::from(member))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity), fields(team_id = %team_id, member_id = %member_id))]
pub(crate) async fn remove_member(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match service::remove_member(&state, &identity, team_id, member_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity), fields(team_id = %team_id, member_id = %member_id))]
pub(crate) async fn member_public_key(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match service::member_public_key(&state, &identity, team_id, member_id).await {
        Ok(public_key) => (
            StatusCode::OK,
            Json(PublicKeyResponse {
                member_id,
                public_key,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(team_id = %team_id, member_id = %member_id))]
pub(crate) async fn confirm_member(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ConfirmMemberRequest>,
) -> impl IntoResponse {
    match service::confirm_member(&state, &identity, team_id, member_id, payload.key).await {
        Ok(member) => (StatusCode::OK, Json(MemberResponse::from(member))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity), fields(team_id = %team_id))]
pub(crate) async fn leave_team(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_id): Path<Uuid>,
) -> impl IntoResponse {
    match service::leave_team(&state, &identity, team_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
