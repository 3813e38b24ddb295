use chrono::Utc;
use locker_core::{Folder, Identity, SyncEvent, SyncEventType};
use locker_db::repo::FolderRepo;
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::errors::{db_error, ServiceError};

fn validate_name(name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::BadRequest("invalid_name"));
    }
    Ok(())
}

pub async fn create_folder(
    state: &AppState,
    identity: &Identity,
    name: String,
) -> Result<Folder, ServiceError> {
    validate_name(&name)?;
    let now = Utc::now();
    let folder = Folder {
        id: Uuid::now_v7(),
        user_id: identity.user_id,
        name,
        revision_date: now,
        created_at: now,
    };
    FolderRepo::new(&state.db)
        .create(&folder)
        .await
        .map_err(|err| db_error("folder_create_failed", &err))?;
    tracing::info!(event = "folder_created", folder_id = %folder.id, "Folder created");
    state
        .notifier
        .notify(
            SyncEvent::new(SyncEventType::FolderUpdate).with_folder(folder.id),
            [identity.user_id],
        )
        .await;
    Ok(folder)
}

pub async fn rename_folder(
    state: &AppState,
    identity: &Identity,
    folder_id: Uuid,
    name: String,
) -> Result<Folder, ServiceError> {
    validate_name(&name)?;
    let repo = FolderRepo::new(&state.db);
    let now = Utc::now();
    let updated = repo
        .rename(folder_id, identity.user_id, &name, now)
        .await
        .map_err(|err| db_error("folder_rename_failed", &err))?;
    if updated == 0 {
        return Err(ServiceError::NotFound);
    }
    let folder = repo
        .get_by_id(folder_id)
        .await
        .map_err(|err| db_error("folder_get_failed", &err))?
        .ok_or(ServiceError::NotFound)?;
    state
        .notifier
        .notify(
            SyncEvent::new(SyncEventType::FolderUpdate).with_folder(folder_id),
            [identity.user_id],
        )
        .await;
    Ok(folder)
}

/// Ciphers inside the folder fall back to no folder.
pub async fn delete_folder(
    state: &AppState,
    identity: &Identity,
    folder_id: Uuid,
) -> Result<(), ServiceError> {
    let deleted = FolderRepo::new(&state.db)
        .delete(folder_id, identity.user_id)
        .await
        .map_err(|err| db_error("folder_delete_failed", &err))?;
    if deleted == 0 {
        return Err(ServiceError::NotFound);
    }
    tracing::info!(event = "folder_deleted", folder_id = %folder_id, "Folder deleted");
    state
        .notifier
        .notify(
            SyncEvent::new(SyncEventType::FolderDelete).with_folder(folder_id),
            [identity.user_id],
        )
        .await;
    Ok(())
}
