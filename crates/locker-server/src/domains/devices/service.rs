use chrono::Utc;
use locker_core::{Device, Identity};
use locker_db::repo::DeviceRepo;
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::errors::{db_error, ServiceError};

pub struct RegisterDeviceCommand {
    pub name: String,
    pub fcm_id: Option<String>,
}

pub async fn register_device(
    state: &AppState,
    identity: &Identity,
    cmd: RegisterDeviceCommand,
) -> Result<Device, ServiceError> {
    let name = cmd.name.trim();
    if name.is_empty() {
        return Err(ServiceError::BadRequest("invalid_name"));
    }
    let now = Utc::now();
    let device = Device {
        id: Uuid::now_v7(),
        user_id: identity.user_id,
        name: name.to_string(),
        fcm_id: cmd.fcm_id.filter(|id| !id.trim().is_empty()),
        last_seen_at: Some(now),
        created_at: now,
    };
    DeviceRepo::new(&state.db)
        .create(&device)
        .await
        .map_err(|err| db_error("device_create_failed", &err))?;
    tracing::info!(
        event = "device_registered",
        device_id = %device.id,
        push = device.fcm_id.is_some(),
        "Device registered"
    );
    Ok(device)
}

pub async fn list_devices(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<Device>, ServiceError> {
    DeviceRepo::new(&state.db)
        .list_by_user(identity.user_id)
        .await
        .map_err(|err| db_error("devices_list_failed", &err))
}

pub async fn delete_device(
    state: &AppState,
    identity: &Identity,
    device_id: Uuid,
) -> Result<(), ServiceError> {
    let deleted = DeviceRepo::new(&state.db)
        .delete(identity.user_id, device_id)
        .await
        .map_err(|err| db_error("device_delete_failed", &err))?;
    if deleted == 0 {
        return Err(ServiceError::NotFound);
    }
    Ok(())
}
