use locker_core::{MemberStatus, TeamMemberRole};
use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

use crate::domains::ciphers::http::v1::CipherResponse;
use crate::domains::folders::http::v1::FolderResponse;

#[derive(Serialize, JsonSchema)]
pub(crate) struct ProfileResponse {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) public_key: Option<String>,
    pub(crate) revision_date: String,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct SyncCipherResponse {
    #[serde(flatten)]
    pub(crate) cipher: CipherResponse,
    pub(crate) collection_ids: Vec<Uuid>,
    pub(crate) view_password: bool,
    pub(crate) edit: bool,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct CollectionResponse {
    pub(crate) id: Uuid,
    pub(crate) team_id: Uuid,
    pub(crate) name: String,
    pub(crate) revision_date: String,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct MembershipResponse {
    pub(crate) member_id: Uuid,
    pub(crate) team_id: Uuid,
    pub(crate) team_name: String,
    pub(crate) role: TeamMemberRole,
    pub(crate) status: MemberStatus,
    pub(crate) hide_passwords: bool,
    /// Team key wrapped for this user, once the owner has provided it.
    pub(crate) key: Option<String>,
    pub(crate) personal_share: bool,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct SyncResponse {
    pub(crate) profile: ProfileResponse,
    pub(crate) ciphers: Vec<SyncCipherResponse>,
    pub(crate) folders: Vec<FolderResponse>,
    pub(crate) collections: Vec<CollectionResponse>,
    pub(crate) memberships: Vec<MembershipResponse>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct RevisionResponse {
    pub(crate) revision_date: String,
}
