use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Extension, Json, Router,
};
use locker_core::{Cipher, CipherType, Identity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::ciphers::service::{self, CreateCipherCommand, UpdateCipherCommand};
use crate::domains::sharing::service as sharing_service;

#[derive(Deserialize, JsonSchema)]
pub(crate) struct CreateCipherRequest {
    pub(crate) cipher_type: CipherType,
    pub(crate) data: String,
    #[serde(default)]
    pub(crate) folder_id: Option<Uuid>,
    #[serde(default)]
    pub(crate) favorite: bool,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct UpdateCipherRequest {
    pub(crate) data: String,
    #[serde(default)]
    pub(crate) favorite: Option<bool>,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct MoveCipherRequest {
    #[serde(default)]
    pub(crate) folder_id: Option<Uuid>,
}

#[derive(Deserialize, JsonSchema)]
pub(crate) struct CipherCollectionsRequest {
    pub(crate) collection_ids: Vec<Uuid>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct CipherCollectionsResponse {
    pub(crate) cipher_id: Uuid,
    pub(crate) collection_ids: Vec<Uuid>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct CipherResponse {
    pub(crate) id: Uuid,
    pub(crate) user_id: Option<Uuid>,
    pub(crate) team_id: Option<Uuid>,
    pub(crate) folder_id: Option<Uuid>,
    pub(crate) cipher_type: CipherType,
    pub(crate) data: String,
    pub(crate) favorite: bool,
    pub(crate) revision_date: String,
    pub(crate) created_at: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/ciphers", post(create_cipher))
        .route(
            "/v1/ciphers/:cipher_id",
            put(update_cipher).delete(delete_cipher),
        )
        .route("/v1/ciphers/:cipher_id/folder", put(move_cipher))
        .route(
            "/v1/ciphers/:cipher_id/collections",
            put(set_cipher_collections),
        )
}

#[tracing::instrument(skip(state, identity, payload))]
async fn create_cipher(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateCipherRequest>,
) -> impl IntoResponse {
    let command = CreateCipherCommand {
        cipher_type: payload.cipher_type,
        data: payload.data,
        folder_id: payload.folder_id,
        favorite: payload.favorite,
    };
    match service::create_cipher(&state, &identity, command).await {
        Ok(cipher) => (StatusCode::CREATED, Json(cipher_response(cipher))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(cipher_id = %cipher_id))]
async fn update_cipher(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(cipher_id): Path<Uuid>,
    Json(payload): Json<UpdateCipherRequest>,
) -> impl IntoResponse {
    let command = UpdateCipherCommand {
        cipher_id,
        data: payload.data,
        favorite: payload.favorite,
    };
    match service::update_cipher(&state, &identity, command).await {
        Ok(cipher) => (StatusCode::OK, Json(cipher_response(cipher))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity), fields(cipher_id = %cipher_id))]
async fn delete_cipher(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(cipher_id): Path<Uuid>,
) -> impl IntoResponse {
    match service::delete_cipher(&state, &identity, cipher_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(cipher_id = %cipher_id))]
async fn move_cipher(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(cipher_id): Path<Uuid>,
    Json(payload): Json<MoveCipherRequest>,
) -> impl IntoResponse {
    match service::move_cipher_to_folder(&state, &identity, cipher_id, payload.folder_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity, payload), fields(cipher_id = %cipher_id))]
async fn set_cipher_collections(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(cipher_id): Path<Uuid>,
    Json(payload): Json<CipherCollectionsRequest>,
) -> impl IntoResponse {
    match sharing_service::set_cipher_collections(
        &state,
        &identity,
        cipher_id,
        payload.collection_ids,
    )
    .await
    {
        Ok(collection_ids) => (
            StatusCode::OK,
            Json(CipherCollectionsResponse {
                cipher_id,
                collection_ids,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) fn cipher_response(cipher: Cipher) -> CipherResponse {
    CipherResponse {
        id: cipher.id,
        user_id: cipher.user_id,
        team_id: cipher.team_id,
        folder_id: cipher.folder_id,
        cipher_type: cipher.cipher_type,
        data: cipher.data,
        favorite: cipher.favorite,
        revision_date: cipher.revision_date.to_rfc3339(),
        created_at: cipher.created_at.to_rfc3339(),
    }
}
