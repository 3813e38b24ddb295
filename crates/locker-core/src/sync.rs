use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventType {
    CipherUpdate,
    CipherDelete,
    FolderUpdate,
    FolderDelete,
    CollectionUpdate,
    SharingInvitation,
    SharingAccepted,
    SharingRejected,
    SharingConfirmed,
    SharingMemberRemoved,
    SharingMemberUpdated,
    SharingStopped,
    SyncVault,
}

impl SyncEventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CipherUpdate => "cipher_update",
            Self::CipherDelete => "cipher_delete",
            Self::FolderUpdate => "folder_update",
            Self::FolderDelete => "folder_delete",
            Self::CollectionUpdate => "collection_update",
            Self::SharingInvitation => "sharing_invitation",
            Self::SharingAccepted => "sharing_accepted",
            Self::SharingRejected => "sharing_rejected",
            Self::SharingConfirmed => "sharing_confirmed",
            Self::SharingMemberRemoved => "sharing_member_removed",
            Self::SharingMemberUpdated => "sharing_member_updated",
            Self::SharingStopped => "sharing_stopped",
            Self::SyncVault => "sync_vault",
        }
    }
}

impl std::fmt::Display for SyncEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification pushed to clients whose vault view changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyncEvent {
    #[serde(rename = "type")]
    pub event_type: SyncEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<Uuid>,
    pub revision_date: DateTime<Utc>,
}

impl SyncEvent {
    #[must_use]
    pub fn new(event_type: SyncEventType) -> Self {
        Self {
            event_type,
            user_id: None,
            team_id: None,
            cipher_id: None,
            folder_id: None,
            member_id: None,
            revision_date: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn with_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    #[must_use]
    pub fn with_cipher(mut self, cipher_id: Uuid) -> Self {
        self.cipher_id = Some(cipher_id);
        self
    }

    #[must_use]
    pub fn with_folder(mut self, folder_id: Uuid) -> Self {
        self.folder_id = Some(folder_id);
        self
    }

    #[must_use]
    pub fn with_member(mut self, member_id: Uuid) -> Self {
        self.member_id = Some(member_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_type_tag_and_skips_empty_ids() {
        let team_id = Uuid::now_v7();
        let event = SyncEvent::new(SyncEventType::SharingStopped).with_team(team_id);
        let value = serde_json::to_value(&event).expect("json");
        assert_eq!(value["type"], "sharing_stopped");
        assert_eq!(value["team_id"], team_id.to_string());
        assert!(value.get("cipher_id").is_none());
        assert!(value.get("revision_date").is_some());
    }

    #[test]
    fn as_str_matches_serde() {
        for event_type in [
            SyncEventType::CipherUpdate,
            SyncEventType::CollectionUpdate,
            SyncEventType::SharingMemberUpdated,
            SyncEventType::SyncVault,
        ] {
            let value = serde_json::to_value(event_type).expect("json");
            assert_eq!(value, event_type.as_str());
        }
    }
}
