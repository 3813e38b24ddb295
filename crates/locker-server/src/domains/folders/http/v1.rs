use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Extension, Json, Router,
};
use locker_core::{Folder, Identity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::folders::service;

#[derive(Deserialize, JsonSchema)]
pub(crate) struct FolderRequest {
    pub(crate) name: String,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct FolderResponse {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) revision_date: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/folders", post(create_folder))
        .route(
            "/v1/folders/:folder_id",
            put(rename_folder).delete(delete_folder),
        )
}

#[tracing::instrument(skip(state, identity, payload))]
async fn create_folder(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<FolderRequest>,
) -> impl IntoResponse {
    match service::create_folder(&state, &identity, payload.name).await {
        Ok(folder) => (StatusCode::CREATED, Json(folder_response(folder))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(folder_id = %folder_id))]
async fn rename_folder(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(folder_id): Path<Uuid>,
    Json(payload): Json<FolderRequest>,
) -> impl IntoResponse {
    match service::rename_folder(&state, &identity, folder_id, payload.name).await {
        Ok(folder) => (StatusCode::OK, Json(folder_response(folder))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity), fields(folder_id = %folder_id))]
async fn delete_folder(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(folder_id): Path<Uuid>,
) -> impl IntoResponse {
    match service::delete_folder(&state, &identity, folder_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) fn folder_response(folder: Folder) -> FolderResponse {
    FolderResponse {
        id: folder.id,
        name: folder.name,
        revision_date: folder.revision_date.to_rfc3339(),
    }
}
