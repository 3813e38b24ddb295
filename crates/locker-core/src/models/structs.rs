use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CipherType, MemberStatus, TeamMemberRole, UserStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub public_key: Option<String>,
    pub status: UserStatus,
    pub revision_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_token_hash: String,
    pub access_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub fcm_id: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub personal_share: bool,
    pub locked: bool,
    pub key: Option<String>,
    pub revision_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub role: TeamMemberRole,
    pub status: MemberStatus,
    pub hide_passwords: bool,
    pub key: Option<String>,
    pub access_time: Option<DateTime<Utc>>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TeamMember {
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.role == TeamMemberRole::Owner
    }

    #[must_use]
    pub fn belongs_to(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamGroup {
    pub team_id: Uuid,
    pub group_id: Uuid,
    pub role: TeamMemberRole,
    pub hide_passwords: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub revision_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub revision_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cipher {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub folder_id: Option<Uuid>,
    pub cipher_type: CipherType,
    pub data: String,
    pub favorite: bool,
    pub revision_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Cipher {
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.team_id.is_some()
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.team_id.is_none() && self.user_id == Some(user_id)
    }

    /// Short digest of the encrypted blob, safe to log.
    #[must_use]
    pub fn data_checksum(&self) -> String {
        data_checksum(&self.data)
    }
}

#[must_use]
pub fn data_checksum(data: &str) -> String {
    let hash = blake3::hash(data.as_bytes()).to_hex();
    hash[..16].to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
