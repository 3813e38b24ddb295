use chrono::Utc;
use locker_core::Identity;
use locker_db::repo::UserRepo;

use crate::app::AppState;
use crate::domains::errors::{db_error, ServiceError};

/// Stores the caller's public key. Owners read it to wrap team keys.
pub async fn update_public_key(
    state: &AppState,
    identity: &Identity,
    public_key: &str,
) -> Result<(), ServiceError> {
    let public_key = public_key.trim();
    if public_key.is_empty() {
        return Err(ServiceError::BadRequest("invalid_public_key"));
    }
    let updated = UserRepo::new(&state.db)
        .update_public_key(identity.user_id, public_key, Utc::now())
        .await
        .map_err(|err| db_error("user_public_key_update_failed", &err))?;
    if updated == 0 {
        return Err(ServiceError::NotFound);
    }
    tracing::info!(event = "public_key_updated", user_id = %identity.user_id, "Public key updated");
    Ok(())
}
