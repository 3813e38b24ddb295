use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use locker_core::Identity;
use locker_db::repo::sharing::GroupMembershipChange;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::groups::service::{self, GroupWithMembers};

#[derive(Deserialize, JsonSchema)]
pub(crate) struct CreateGroupRequest {
    pub(crate) name: String,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct AddGroupMemberRequest {
    pub(crate) user_id: Uuid,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct GroupResponse {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) member_ids: Vec<Uuid>,
    pub(crate) created_at: String,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct GroupListResponse {
    pub(crate) groups: Vec<GroupResponse>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct GroupMembershipResponse {
    pub(crate) changed: bool,
    /// Share memberships created or removed by the change.
    pub(crate) team_ids: Vec<Uuid>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/groups", get(list_groups).post(create_group))
        .route("/v1/groups/:group_id/members", post(add_group_member))
        .route(
            "/v1/groups/:group_id/members/:user_id",
            delete(remove_group_member),
        )
}

#[tracing::instrument(skip(state, _identity))]
async fn list_groups(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::list_groups(&state).await {
        Ok(groups) => {
            let groups = groups.into_iter().map(group_response).collect();
            (StatusCode::OK, Json(GroupListResponse { groups })).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
async fn create_group(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateGroupRequest>,
) -> impl IntoResponse {
    match service::create_group(&state, &identity, &payload.name).await {
        Ok(group) => (
            StatusCode::CREATED,
            Json(group_response(GroupWithMembers {
                group,
                members: Vec::new(),
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(group_id = %group_id))]
async fn add_group_member(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<AddGroupMemberRequest>,
) -> impl IntoResponse {
    match service::add_group_member(&state, &identity, group_id, payload.user_id).await {
        Ok(change) => (StatusCode::OK, Json(membership_response(change))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity), fields(group_id = %group_id, user_id = %user_id))]
async fn remove_group_member(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match service::remove_group_member(&state, &identity, group_id, user_id).await {
        Ok(change) => (StatusCode::OK, Json(membership_response(change))).into_response(),
        Err(err) => err.into_response(),
    }
}

fn group_response(entry: GroupWithMembers) -> GroupResponse {
    GroupResponse {
        id: entry.group.id,
        name: entry.group.name,
        member_ids: entry.members.iter().map(|member| member.user_id).collect(),
        created_at: entry.group.created_at.to_rfc3339(),
    }
}

fn membership_response(change: GroupMembershipChange) -> GroupMembershipResponse {
    GroupMembershipResponse {
        changed: change.changed,
        team_ids: change
            .memberships
            .iter()
            .map(|member| member.team_id)
            .collect(),
    }
}
