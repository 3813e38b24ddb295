use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use locker_core::Identity;
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::sharing::service::{
    self, JoinedShare, OwnedShare, ShareCipherCommand, ShareFolderCommand, ShareResult,
    StopSharingCommand,
};

use super::super::types::{
    cipher_pairs, AddCipherRequest, InvitedMemberResponse, JoinedShareResponse,
    OwnedShareResponse, ShareCipherRequest, ShareFolderRequest, ShareListResponse, ShareResponse,
    StopSharingRequest, StopSharingResponse,
};

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn list_shares(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::list_shares(&state, &identity).await {
        Ok(list) => (
            StatusCode::OK,
            Json(ShareListResponse {
                owned: list.owned.into_iter().map(owned_share_response).collect(),
                shared_with_me: list.joined.into_iter().map(joined_share_response).collect(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(cipher_id = %payload.cipher_id))]
pub(crate) async fn share_cipher(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ShareCipherRequest>,
) -> impl IntoResponse {
    let cmd = ShareCipherCommand {
        cipher_id: payload.cipher_id,
        data: payload.data,
        team_key: payload.team_key,
        team_name: payload.team_name,
        members: payload.members,
        groups: payload.groups,
    };
    match service::share_cipher(&state, &identity, cmd).await {
        Ok(result) => {
            let status = if result.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(share_response(result))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(folder_id = %payload.folder_id))]
pub(crate) async fn share_folder(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ShareFolderRequest>,
) -> impl IntoResponse {
    let cmd = ShareFolderCommand {
        folder_id: payload.folder_id,
        folder_name: payload.folder_name,
        ciphers: cipher_pairs(payload.ciphers),
        team_key: payload.team_key,
        members: payload.members,
        groups: payload.groups,
    };
    match service::share_folder(&state, &identity, cmd).await {
        Ok(result) => (StatusCode::CREATED, Json(share_response(result))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(team_id = %team_id))]
pub(crate) async fn stop_sharing(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_id): Path<Uuid>,
    Json(payload): Json<StopSharingRequest>,
) -> impl IntoResponse {
    let cmd = StopSharingCommand {
        team_id,
        ciphers: cipher_pairs(payload.ciphers),
        folder_name: payload.folder_name,
    };
    match service::stop_sharing(&state, &identity, cmd).await {
        Ok(stopped) => (
            StatusCode::OK,
            Json(StopSharingResponse {
                cipher_ids: stopped.cipher_ids,
                folder_id: stopped.folder.map(|folder| folder.id),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(
    skip(state, identity, payload),
    fields(team_id = %team_id, collection_id = %collection_id)
)]
pub(crate) async fn add_cipher_to_share(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((team_id, collection_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AddCipherRequest>,
) -> impl IntoResponse {
    match service::add_cipher_to_share(
        &state,
        &identity,
        team_id,
        collection_id,
        payload.cipher_id,
        payload.data,
    )
    .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(super) fn share_response(result: ShareResult) -> ShareResponse {
    ShareResponse {
        team_id: result.team_id,
        created: result.created,
        invited: result
            .invited
            .into_iter()
            .map(|invited| InvitedMemberResponse {
                member_id: invited.member.id,
                email: invited.member.email,
                user_id: invited.member.user_id,
                status: invited.member.status,
                outcome: invited.outcome,
            })
            .collect(),
    }
}

fn owned_share_response(share: OwnedShare) -> OwnedShareResponse {
    let (collection_id, collection_name) = match share.collection {
        Some(collection) => (Some(collection.id), Some(collection.name)),
        None => (None, None),
    };
    OwnedShareResponse {
        team_id: share.team.id,
        name: share.team.name,
        locked: share.team.locked,
        revision_date: share.team.revision_date.to_rfc3339(),
        members: share.members.into_iter().map(Into::into).collect(),
        groups: share.groups.into_iter().map(Into::into).collect(),
        cipher_ids: share.cipher_ids,
        collection_id,
        collection_name,
    }
}

fn joined_share_response(share: JoinedShare) -> JoinedShareResponse {
    JoinedShareResponse {
        team_id: share.team.id,
        name: share.team.name,
        member_id: share.membership.id,
        role: share.membership.role,
        status: share.membership.status,
        hide_passwords: share.membership.hide_passwords,
    }
}
