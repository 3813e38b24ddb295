use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use locker_core::Identity;
use locker_db::repo::sharing::PendingInvitation;
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::sharing::service;

use super::super::types::{
    InvitationItem, InvitationListResponse, RespondInvitationRequest, RespondInvitationResponse,
    SharedItemKind,
};

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn list_invitations(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::list_invitations(&state, &identity).await {
        Ok(invitations) => {
            let invitations = invitations.into_iter().map(invitation_item).collect();
            (StatusCode::OK, Json(InvitationListResponse { invitations })).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(member_id = %member_id))]
pub(crate) async fn respond_invitation(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<RespondInvitationRequest>,
) -> impl IntoResponse {
    match service::respond_invitation(&state, &identity, member_id, payload.accept).await {
        Ok(response) => (
            StatusCode::OK,
            Json(RespondInvitationResponse {
                member_id: response.member.id,
                team_id: response.member.team_id,
                accepted: response.accepted,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

fn invitation_item(invitation: PendingInvitation) -> InvitationItem {
    // Folder shares carry a collection; single-cipher shares never do.
    let kind = if invitation.collection_name.is_some() {
        SharedItemKind::Folder
    } else {
        SharedItemKind::Cipher
    };
    InvitationItem {
        member_id: invitation.member.id,
        team_id: invitation.member.team_id,
        team_name: invitation.team_name,
        owner_email: invitation.owner_email,
        role: invitation.member.role,
        hide_passwords: invitation.member.hide_passwords,
        cipher_id: match kind {
            SharedItemKind::Cipher => invitation.cipher_id,
            SharedItemKind::Folder => None,
        },
        kind,
        collection_name: invitation.collection_name,
        invited_at: invitation.member.created_at.to_rfc3339(),
    }
}
