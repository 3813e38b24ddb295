use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use locker_core::{Device, Identity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::devices::service::{self, RegisterDeviceCommand};

#[derive(Deserialize, JsonSchema)]
pub(crate) struct RegisterDeviceRequest {
    pub(crate) name: String,
    /// Firebase registration id; omit to opt out of push.
    #[serde(default)]
    pub(crate) fcm_id: Option<String>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct DeviceResponse {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) push_enabled: bool,
    pub(crate) last_seen_at: Option<String>,
    pub(crate) created_at: String,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct DeviceListResponse {
    pub(crate) devices: Vec<DeviceResponse>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/devices", get(list_devices).post(register_device))
        .route("/v1/devices/:device_id", delete(delete_device))
}

#[tracing::instrument(skip(state, identity))]
async fn list_devices(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::list_devices(&state, &identity).await {
        Ok(devices) => {
            let devices = devices.into_iter().map(device_response).collect();
            (StatusCode::OK, Json(DeviceListResponse { devices })).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload))]
async fn register_device(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<RegisterDeviceRequest>,
) -> impl IntoResponse {
    let cmd = RegisterDeviceCommand {
        name: payload.name,
        fcm_id: payload.fcm_id,
    };
    match service::register_device(&state, &identity, cmd).await {
        Ok(device) => (StatusCode::CREATED, Json(device_response(device))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity), fields(device_id = %device_id))]
async fn delete_device(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(device_id): Path<Uuid>,
) -> impl IntoResponse {
    match service::delete_device(&state, &identity, device_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

fn device_response(device: Device) -> DeviceResponse {
    DeviceResponse {
        id: device.id,
        name: device.name,
        push_enabled: device.fcm_id.is_some(),
        last_seen_at: device.last_seen_at.map(|at| at.to_rfc3339()),
        created_at: device.created_at.to_rfc3339(),
    }
}
