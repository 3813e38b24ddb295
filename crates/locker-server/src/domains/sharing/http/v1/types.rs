use locker_core::sharing::{GroupInvite, InviteOutcome, MemberInvite};
use locker_core::{MemberStatus, TeamGroup, TeamMember, TeamMemberRole};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize, JsonSchema)]
pub(crate) struct CipherPayload {
    pub(crate) id: Uuid,
    pub(crate) data: String,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct ShareCipherRequest {
    pub(crate) cipher_id: Uuid,
    /// Cipher re-encrypted with the team key.
    pub(crate) data: String,
    /// Team key wrapped for the owner.
    pub(crate) team_key: String,
    #[serde(default)]
    pub(crate) team_name: Option<String>,
    #[serde(default)]
    pub(crate) members: Vec<MemberInvite>,
    #[serde(default)]
    pub(crate) groups: Vec<GroupInvite>,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct ShareFolderRequest {
    pub(crate) folder_id: Uuid,
    pub(crate) folder_name: String,
    pub(crate) ciphers: Vec<CipherPayload>,
    pub(crate) team_key: String,
    #[serde(default)]
    pub(crate) members: Vec<MemberInvite>,
    #[serde(default)]
    pub(crate) groups: Vec<GroupInvite>,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct AddMembersRequest {
    #[serde(default)]
    pub(crate) members: Vec<MemberInvite>,
    #[serde(default)]
    pub(crate) groups: Vec<GroupInvite>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct InvitedMemberResponse {
    pub(crate) member_id: Uuid,
    pub(crate) email: Option<String>,
    pub(crate) user_id: Option<Uuid>,
    pub(crate) status: MemberStatus,
    pub(crate) outcome: InviteOutcome,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct ShareResponse {
    pub(crate) team_id: Uuid,
    pub(crate) created: bool,
    pub(crate) invited: Vec<InvitedMemberResponse>,
}

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SharedItemKind {
    Cipher,
    Folder,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct InvitationItem {
    pub(crate) member_id: Uuid,
    pub(crate) team_id: Uuid,
    pub(crate) team_name: String,
    pub(crate) owner_email: Option<String>,
    pub(crate) role: TeamMemberRole,
    pub(crate) hide_passwords: bool,
    pub(crate) kind: SharedItemKind,
    pub(crate) cipher_id: Option<Uuid>,
    pub(crate) collection_name: Option<String>,
    pub(crate) invited_at: String,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct InvitationListResponse {
    pub(crate) invitations: Vec<InvitationItem>,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct RespondInvitationRequest {
    pub(crate) accept: bool,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct RespondInvitationResponse {
    pub(crate) member_id: Uuid,
    pub(crate) team_id: Uuid,
    pub(crate) accepted: bool,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct UpdateMemberRequest {
    #[serde(default)]
    pub(crate) role: Option<TeamMemberRole>,
    #[serde(default)]
    pub(crate) hide_passwords: Option<bool>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct MemberResponse {
    pub(crate) id: Uuid,
    pub(crate) team_id: Uuid,
    pub(crate) user_id: Option<Uuid>,
    pub(crate) email: Option<String>,
    pub(crate) role: TeamMemberRole,
    pub(crate) status: MemberStatus,
    pub(crate) hide_passwords: bool,
    pub(crate) group_id: Option<Uuid>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct PublicKeyResponse {
    pub(crate) member_id: Uuid,
    pub(crate) public_key: String,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct ConfirmMemberRequest {
    /// Team key wrapped with the member's public key.
    pub(crate) key: String,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct StopSharingRequest {
    pub(crate) ciphers: Vec<CipherPayload>,
    #[serde(default)]
    pub(crate) folder_name: Option<String>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct StopSharingResponse {
    pub(crate) cipher_ids: Vec<Uuid>,
    pub(crate) folder_id: Option<Uuid>,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct AddCipherRequest {
    pub(crate) cipher_id: Uuid,
    pub(crate) data: String,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct TeamGroupResponse {
    pub(crate) group_id: Uuid,
    pub(crate) role: TeamMemberRole,
    pub(crate) hide_passwords: bool,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct OwnedShareResponse {
    pub(crate) team_id: Uuid,
    pub(crate) name: String,
    pub(crate) locked: bool,
    pub(crate) revision_date: String,
    pub(crate) members: Vec<MemberResponse>,
    pub(crate) groups: Vec<TeamGroupResponse>,
    pub(crate) cipher_ids: Vec<Uuid>,
    pub(crate) collection_id: Option<Uuid>,
    pub(crate) collection_name: Option<String>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct JoinedShareResponse {
    pub(crate) team_id: Uuid,
    pub(crate) name: String,
    pub(crate) member_id: Uuid,
    pub(crate) role: TeamMemberRole,
    pub(crate) status: MemberStatus,
    pub(crate) hide_passwords: bool,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct ShareListResponse {
    pub(crate) owned: Vec<OwnedShareResponse>,
    pub(crate) shared_with_me: Vec<JoinedShareResponse>,
}

impl From<TeamMember> for MemberResponse {
    fn from(member: TeamMember) -> Self {
        Self {
            id: member.id,
            team_id: member.team_id,
            user_id: member.user_id,
            email: member.email,
            role: member.role,
            status: member.status,
            hide_passwords: member.hide_passwords,
            group_id: member.group_id,
        }
    }
}

impl From<TeamGroup> for TeamGroupResponse {
    fn from(link: TeamGroup) -> Self {
        Self {
            group_id: link.group_id,
            role: link.role,
            hide_passwords: link.hide_passwords,
        }
    }
}

pub(crate) fn cipher_pairs(ciphers: Vec<CipherPayload>) -> Vec<(Uuid, String)> {
    ciphers
        .into_iter()
        .map(|cipher| (cipher.id, cipher.data))
        .collect()
}
