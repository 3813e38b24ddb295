use chrono::Utc;
use locker_core::{Cipher, CipherType, Identity, MemberStatus, SyncEvent, SyncEventType};
use locker_db::repo::{CipherRepo, FolderRepo, TeamMemberRepo};
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::errors::{db_error, forbidden, ServiceError};

pub struct CreateCipherCommand {
    pub cipher_type: CipherType,
    pub data: String,
    pub folder_id: Option<Uuid>,
    pub favorite: bool,
}

pub struct UpdateCipherCommand {
    pub cipher_id: Uuid,
    pub data: String,
    pub favorite: Option<bool>,
}

pub async fn create_cipher(
    state: &AppState,
    identity: &Identity,
    cmd: CreateCipherCommand,
) -> Result<Cipher, ServiceError> {
    if cmd.data.trim().is_empty() {
        return Err(ServiceError::BadRequest("invalid_data"));
    }
    if let Some(folder_id) = cmd.folder_id {
        ensure_own_folder(state, identity, folder_id).await?;
    }
    let now = Utc::now();
    let cipher = Cipher {
        id: Uuid::now_v7(),
        user_id: Some(identity.user_id),
        team_id: None,
        folder_id: cmd.folder_id,
        cipher_type: cmd.cipher_type,
        data: cmd.data,
        favorite: cmd.favorite,
        revision_date: now,
        created_at: now,
        deleted_at: None,
    };
    CipherRepo::new(&state.db)
        .create(&cipher)
        .await
        .map_err(|err| db_error("cipher_create_failed", &err))?;

    tracing::info!(
        event = "cipher_created",
        cipher_id = %cipher.id,
        checksum = %cipher.data_checksum(),
        "Cipher created"
    );
    state
        .notifier
        .notify(
            SyncEvent::new(SyncEventType::CipherUpdate).with_cipher(cipher.id),
            [identity.user_id],
        )
        .await;
    Ok(cipher)
}

pub async fn update_cipher(
    state: &AppState,
    identity: &Identity,
    cmd: UpdateCipherCommand,
) -> Result<Cipher, ServiceError> {
    if cmd.data.trim().is_empty() {
        return Err(ServiceError::BadRequest("invalid_data"));
    }
    let repo = CipherRepo::new(&state.db);
    let cipher = repo
        .get_by_id(cmd.cipher_id)
        .await
        .map_err(|err| db_error("cipher_get_failed", &err))?
        .ok_or(ServiceError::NotFound)?;

    let affected = match cipher.team_id {
        None if cipher.is_owned_by(identity.user_id) => vec![identity.user_id],
        None => return Err(ServiceError::NotFound),
        Some(team_id) => {
            let members = TeamMemberRepo::new(&state.db);
            let member = members
                .get_for_user(team_id, identity.user_id)
                .await
                .map_err(|err| db_error("team_member_get_failed", &err))?
                .ok_or(ServiceError::NotFound)?;
            if member.status != MemberStatus::Confirmed || !member.role.can_edit_ciphers() {
                return Err(forbidden("update", &format!("ciphers/{}", cipher.id)));
            }
            members
                .confirmed_user_ids(team_id)
                .await
                .map_err(|err| db_error("team_members_list_failed", &err))?
        }
    };

    let now = Utc::now();
    let updated = repo
        .update_data(&cipher, &cmd.data, cmd.favorite, now)
        .await
        .map_err(|err| db_error("cipher_update_failed", &err))?;
    if updated == 0 {
        let still_there = repo
            .get_by_id(cipher.id)
            .await
            .map_err(|err| db_error("cipher_get_failed", &err))?;
        return Err(match still_there {
            Some(_) => ServiceError::Conflict("cipher_changed"),
            None => ServiceError::NotFound,
        });
    }
    let cipher = Cipher {
        data: cmd.data,
        favorite: cmd.favorite.unwrap_or(cipher.favorite),
        revision_date: now,
        ..cipher
    };

    tracing::info!(
        event = "cipher_updated",
        cipher_id = %cipher.id,
        shared = cipher.is_shared(),
        checksum = %cipher.data_checksum(),
        "Cipher updated"
    );
    let mut event = SyncEvent::new(SyncEventType::CipherUpdate).with_cipher(cipher.id);
    if let Some(team_id) = cipher.team_id {
        event = event.with_team(team_id);
    }
    state.notifier.notify(event, affected).await;
    Ok(cipher)
}

pub async fn delete_cipher(
    state: &AppState,
    identity: &Identity,
    cipher_id: Uuid,
) -> Result<(), ServiceError> {
    let repo = CipherRepo::new(&state.db);
    let cipher = repo
        .get_by_id(cipher_id)
        .await
        .map_err(|err| db_error("cipher_get_failed", &err))?
        .ok_or(ServiceError::NotFound)?;
    if let Some(team_id) = cipher.team_id {
        let member = TeamMemberRepo::new(&state.db)
            .get_for_user(team_id, identity.user_id)
            .await
            .map_err(|err| db_error("team_member_get_failed", &err))?;
        return Err(match member {
            Some(_) => ServiceError::BadRequest("cipher_shared"),
            None => ServiceError::NotFound,
        });
    }
    let deleted = repo
        .delete_personal(cipher_id, identity.user_id, Utc::now())
        .await
        .map_err(|err| db_error("cipher_delete_failed", &err))?;
    if deleted == 0 {
        return Err(ServiceError::NotFound);
    }

    tracing::info!(event = "cipher_deleted", cipher_id = %cipher_id, "Cipher deleted");
    state
        .notifier
        .notify(
            SyncEvent::new(SyncEventType::CipherDelete).with_cipher(cipher_id),
            [identity.user_id],
        )
        .await;
    Ok(())
}

pub async fn move_cipher_to_folder(
    state: &AppState,
    identity: &Identity,
    cipher_id: Uuid,
    folder_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    if let Some(folder_id) = folder_id {
        ensure_own_folder(state, identity, folder_id).await?;
    }
    let moved = CipherRepo::new(&state.db)
        .set_folder(cipher_id, identity.user_id, folder_id, Utc::now())
        .await
        .map_err(|err| db_error("cipher_move_failed", &err))?;
    if moved == 0 {
        return Err(ServiceError::NotFound);
    }
    let mut event = SyncEvent::new(SyncEventType::CipherUpdate).with_cipher(cipher_id);
    if let Some(folder_id) = folder_id {
        event = event.with_folder(folder_id);
    }
    state.notifier.notify(event, [identity.user_id]).await;
    Ok(())
}

async fn ensure_own_folder(
    state: &AppState,
    identity: &Identity,
    folder_id: Uuid,
) -> Result<(), ServiceError> {
    let folder = FolderRepo::new(&state.db)
        .get_by_id(folder_id)
        .await
        .map_err(|err| db_error("folder_get_failed", &err))?;
    match folder {
        Some(folder) if folder.user_id == identity.user_id => Ok(()),
        _ => Err(ServiceError::BadRequest("folder_not_found")),
    }
}
