use aide::axum::{
    routing::{delete, get, post, put},
    ApiRouter,
};
use aide::openapi::{Info, OpenApi};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;
use locker_core::{CipherType, MemberStatus, TeamMemberRole};
use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::ciphers::http::v1::{
    CipherCollectionsRequest, CipherCollectionsResponse, CipherResponse, CreateCipherRequest,
    MoveCipherRequest, UpdateCipherRequest,
};
use crate::domains::devices::http::v1::{
    DeviceListResponse, DeviceResponse, RegisterDeviceRequest,
};
use crate::domains::folders::http::v1::{FolderRequest, FolderResponse};
use crate::domains::groups::http::v1::{
    AddGroupMemberRequest, CreateGroupRequest, GroupListResponse, GroupMembershipResponse,
    GroupResponse,
};
use crate::domains::sharing::http::v1::types::{
    AddCipherRequest, AddMembersRequest, ConfirmMemberRequest, InvitationListResponse,
    MemberResponse, PublicKeyResponse, RespondInvitationRequest, RespondInvitationResponse,
    ShareCipherRequest, ShareFolderRequest, ShareListResponse, ShareResponse, StopSharingRequest,
    StopSharingResponse, UpdateMemberRequest,
};
use crate::domains::sync::http::v1::types::{ProfileResponse, RevisionResponse, SyncResponse};
use crate::domains::system::http::v1::SystemInfoResponse;
use crate::domains::users::http::v1::PublicKeyRequest;
use crate::http::routes::health::HealthResponse;

#[allow(dead_code)]
#[derive(Deserialize, JsonSchema)]
struct TeamMemberPath {
    team_id: Uuid,
    member_id: Uuid,
}

#[allow(dead_code)]
#[derive(Deserialize, JsonSchema)]
struct TeamCollectionPath {
    team_id: Uuid,
    collection_id: Uuid,
}

#[allow(dead_code)]
#[derive(Deserialize, JsonSchema)]
struct GroupMemberPath {
    group_id: Uuid,
    user_id: Uuid,
}

pub fn build_openapi() -> OpenApi {
    let mut api = OpenApi {
        info: Info {
            title: "locker-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let _ = doc_router().finish_api(&mut api);
    api
}

fn doc_router() -> ApiRouter<AppState> {
    ApiRouter::new()
        .api_route("/health", get(health))
        .api_route("/v1/system/info", get(system_info))
        .api_route("/v1/ciphers", post(ciphers_create))
        .api_route(
            "/v1/ciphers/:cipher_id",
            put(ciphers_update).delete(ciphers_delete),
        )
        .api_route("/v1/ciphers/:cipher_id/folder", put(ciphers_move))
        .api_route(
            "/v1/ciphers/:cipher_id/collections",
            put(ciphers_collections),
        )
        .api_route("/v1/folders", post(folders_create))
        .api_route(
            "/v1/folders/:folder_id",
            put(folders_rename).delete(folders_delete),
        )
        .api_route("/v1/sharing", get(sharing_list))
        .api_route("/v1/sharing/ciphers", post(sharing_share_cipher))
        .api_route("/v1/sharing/folders", post(sharing_share_folder))
        .api_route("/v1/sharing/invitations", get(sharing_invitations))
        .api_route(
            "/v1/sharing/invitations/:member_id",
            post(sharing_respond),
        )
        .api_route("/v1/sharing/:team_id/members", post(sharing_add_members))
        .api_route(
            "/v1/sharing/:team_id/members/:member_id",
            put(sharing_update_member).delete(sharing_remove_member),
        )
        .api_route(
            "/v1/sharing/:team_id/members/:member_id/public-key",
            get(sharing_public_key),
        )
        .api_route(
            "/v1/sharing/:team_id/members/:member_id/confirm",
            post(sharing_confirm),
        )
        .api_route("/v1/sharing/:team_id/leave", post(sharing_leave))
        .api_route("/v1/sharing/:team_id/stop", post(sharing_stop))
        .api_route(
            "/v1/sharing/:team_id/collections/:collection_id/ciphers",
            post(sharing_add_cipher),
        )
        .api_route("/v1/groups", get(groups_list).post(groups_create))
        .api_route("/v1/groups/:group_id/members", post(groups_add_member))
        .api_route(
            "/v1/groups/:group_id/members/:user_id",
            delete(groups_remove_member),
        )
        .api_route("/v1/devices", get(devices_list).post(devices_register))
        .api_route("/v1/devices/:device_id", delete(devices_delete))
        .api_route("/v1/users/me/public-key", put(users_public_key))
        .api_route("/v1/sync", get(sync_full))
        .api_route("/v1/sync/revision", get(sync_revision))
        .api_route("/v1/sync/events", get(sync_events))
}

fn not_implemented<T>(body: T) -> (StatusCode, Json<T>) {
    (StatusCode::NOT_IMPLEMENTED, Json(body))
}

fn empty_cipher() -> CipherResponse {
    CipherResponse {
        id: Uuid::nil(),
        user_id: None,
        team_id: None,
        folder_id: None,
        cipher_type: CipherType::Login,
        data: String::new(),
        favorite: false,
        revision_date: String::new(),
        created_at: String::new(),
    }
}

fn empty_folder() -> FolderResponse {
    FolderResponse {
        id: Uuid::nil(),
        name: String::new(),
        revision_date: String::new(),
    }
}

fn empty_member() -> MemberResponse {
    MemberResponse {
        id: Uuid::nil(),
        team_id: Uuid::nil(),
        user_id: None,
        email: None,
        role: TeamMemberRole::Member,
        status: MemberStatus::Invited,
        hide_passwords: false,
        group_id: None,
    }
}

fn empty_share() -> ShareResponse {
    ShareResponse {
        team_id: Uuid::nil(),
        created: false,
        invited: Vec::new(),
    }
}

fn empty_membership_change() -> GroupMembershipResponse {
    GroupMembershipResponse {
        changed: false,
        team_ids: Vec::new(),
    }
}

async fn health() -> (StatusCode, Json<HealthResponse>) {
    not_implemented(HealthResponse {
        status: "not_implemented",
        version: "0.0.0",
        uptime_seconds: 0,
    })
}

async fn system_info() -> (StatusCode, Json<SystemInfoResponse>) {
    not_implemented(SystemInfoResponse {
        version: "0.0.0",
        build_commit: None,
        server_name: None,
        server_fingerprint: String::new(),
        push_enabled: false,
        email_invites_enabled: false,
        max_invitations_per_request: 0,
    })
}

async fn ciphers_create(
    Json(_payload): Json<CreateCipherRequest>,
) -> (StatusCode, Json<CipherResponse>) {
    not_implemented(empty_cipher())
}

async fn ciphers_update(
    Path(_cipher_id): Path<Uuid>,
    Json(_payload): Json<UpdateCipherRequest>,
) -> (StatusCode, Json<CipherResponse>) {
    not_implemented(empty_cipher())
}

async fn ciphers_delete(Path(_cipher_id): Path<Uuid>) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

async fn ciphers_move(
    Path(_cipher_id): Path<Uuid>,
    Json(_payload): Json<MoveCipherRequest>,
) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

async fn ciphers_collections(
    Path(_cipher_id): Path<Uuid>,
    Json(_payload): Json<CipherCollectionsRequest>,
) -> (StatusCode, Json<CipherCollectionsResponse>) {
    not_implemented(CipherCollectionsResponse {
        cipher_id: Uuid::nil(),
        collection_ids: Vec::new(),
    })
}

async fn folders_create(Json(_payload): Json<FolderRequest>) -> (StatusCode, Json<FolderResponse>) {
    not_implemented(empty_folder())
}

async fn folders_rename(
    Path(_folder_id): Path<Uuid>,
    Json(_payload): Json<FolderRequest>,
) -> (StatusCode, Json<FolderResponse>) {
    not_implemented(empty_folder())
}

async fn folders_delete(Path(_folder_id): Path<Uuid>) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

async fn sharing_list() -> (StatusCode, Json<ShareListResponse>) {
    not_implemented(ShareListResponse {
        owned: Vec::new(),
        shared_with_me: Vec::new(),
    })
}

async fn sharing_share_cipher(
    Json(_payload): Json<ShareCipherRequest>,
) -> (StatusCode, Json<ShareResponse>) {
    not_implemented(empty_share())
}

async fn sharing_share_folder(
    Json(_payload): Json<ShareFolderRequest>,
) -> (StatusCode, Json<ShareResponse>) {
    not_implemented(empty_share())
}

async fn sharing_invitations() -> (StatusCode, Json<InvitationListResponse>) {
    not_implemented(InvitationListResponse {
        invitations: Vec::new(),
    })
}

async fn sharing_respond(
    Path(_member_id): Path<Uuid>,
    Json(_payload): Json<RespondInvitationRequest>,
) -> (StatusCode, Json<RespondInvitationResponse>) {
    not_implemented(RespondInvitationResponse {
        member_id: Uuid::nil(),
        team_id: Uuid::nil(),
        accepted: false,
    })
}

async fn sharing_add_members(
    Path(_team_id): Path<Uuid>,
    Json(_payload): Json<AddMembersRequest>,
) -> (StatusCode, Json<ShareResponse>) {
    not_implemented(empty_share())
}

async fn sharing_update_member(
    Path(_path): Path<TeamMemberPath>,
    Json(_payload): Json<UpdateMemberRequest>,
) -> (StatusCode, Json<MemberResponse>) {
    not_implemented(empty_member())
}

async fn sharing_remove_member(Path(_path): Path<TeamMemberPath>) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

async fn sharing_public_key(
    Path(_path): Path<TeamMemberPath>,
) -> (StatusCode, Json<PublicKeyResponse>) {
    not_implemented(PublicKeyResponse {
        member_id: Uuid::nil(),
        public_key: String::new(),
    })
}

async fn sharing_confirm(
    Path(_path): Path<TeamMemberPath>,
    Json(_payload): Json<ConfirmMemberRequest>,
) -> (StatusCode, Json<MemberResponse>) {
    not_implemented(empty_member())
}

async fn sharing_leave(Path(_team_id): Path<Uuid>) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

async fn sharing_stop(
    Path(_team_id): Path<Uuid>,
    Json(_payload): Json<StopSharingRequest>,
) -> (StatusCode, Json<StopSharingResponse>) {
    not_implemented(StopSharingResponse {
        cipher_ids: Vec::new(),
        folder_id: None,
    })
}

async fn sharing_add_cipher(
    Path(_path): Path<TeamCollectionPath>,
    Json(_payload): Json<AddCipherRequest>,
) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

async fn groups_list() -> (StatusCode, Json<GroupListResponse>) {
    not_implemented(GroupListResponse { groups: Vec::new() })
}

async fn groups_create(
    Json(_payload): Json<CreateGroupRequest>,
) -> (StatusCode, Json<GroupResponse>) {
    not_implemented(GroupResponse {
        id: Uuid::nil(),
        name: String::new(),
        member_ids: Vec::new(),
        created_at: String::new(),
    })
}

async fn groups_add_member(
    Path(_group_id): Path<Uuid>,
    Json(_payload): Json<AddGroupMemberRequest>,
) -> (StatusCode, Json<GroupMembershipResponse>) {
    not_implemented(empty_membership_change())
}

async fn groups_remove_member(
    Path(_path): Path<GroupMemberPath>,
) -> (StatusCode, Json<GroupMembershipResponse>) {
    not_implemented(empty_membership_change())
}

async fn devices_list() -> (StatusCode, Json<DeviceListResponse>) {
    not_implemented(DeviceListResponse {
        devices: Vec::new(),
    })
}

async fn devices_register(
    Json(_payload): Json<RegisterDeviceRequest>,
) -> (StatusCode, Json<DeviceResponse>) {
    not_implemented(DeviceResponse {
        id: Uuid::nil(),
        name: String::new(),
        push_enabled: false,
        last_seen_at: None,
        created_at: String::new(),
    })
}

async fn devices_delete(Path(_device_id): Path<Uuid>) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

async fn users_public_key(Json(_payload): Json<PublicKeyRequest>) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

async fn sync_full() -> (StatusCode, Json<SyncResponse>) {
    not_implemented(SyncResponse {
        profile: ProfileResponse {
            id: Uuid::nil(),
            email: String::new(),
            name: None,
            public_key: None,
            revision_date: String::new(),
        },
        ciphers: Vec::new(),
        folders: Vec::new(),
        collections: Vec::new(),
        memberships: Vec::new(),
    })
}

async fn sync_revision() -> (StatusCode, Json<RevisionResponse>) {
    not_implemented(RevisionResponse {
        revision_date: String::new(),
    })
}

// Served as text/event-stream; the schema carries no body.
async fn sync_events() -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}
