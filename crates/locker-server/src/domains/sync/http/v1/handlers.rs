use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Extension, Json,
};
use futures::stream::Stream;
use locker_core::{Identity, SyncEvent};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::app::AppState;
use crate::domains::ciphers::http::v1::cipher_response;
use crate::domains::folders::http::v1::folder_response;
use crate::domains::sync::service::{self, SyncPayload};
use crate::infra::metrics;

use super::types::{
    CollectionResponse, MembershipResponse, ProfileResponse, RevisionResponse, SyncCipherResponse,
    SyncResponse,
};

const KEEP_ALIVE_SECONDS: u64 = 15;

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn sync(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::sync(&state, &identity).await {
        Ok(payload) => (StatusCode::OK, Json(sync_response(payload))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[tracing::instrument(skip(state, identity))]
pub(crate) async fn revision(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    match service::revision(&state, &identity).await {
        Ok(revision_date) => (
            StatusCode::OK,
            Json(RevisionResponse {
                revision_date: revision_date.to_rfc3339(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Server-sent stream of the sync events addressed to the caller.
pub(crate) async fn events(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = identity.user_id;
    let guard = SubscriberGuard::open();
    tracing::debug!(event = "sync_stream_opened", user_id = %user_id);

    let stream = BroadcastStream::new(state.notifier.subscribe()).filter_map(move |message| {
        let _open = &guard;
        match message {
            Ok(envelope) if envelope.addresses(user_id) => sse_event(&envelope.event).map(Ok),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                metrics::sync_events_lagged(skipped);
                tracing::warn!(
                    event = "sync_events_lagged",
                    user_id = %user_id,
                    skipped,
                    "Sync subscriber fell behind"
                );
                None
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEP_ALIVE_SECONDS)))
}

fn sse_event(event: &SyncEvent) -> Option<Event> {
    match Event::default().event(event.event_type.as_str()).json_data(event) {
        Ok(sse) => Some(sse),
        Err(err) => {
            tracing::error!(event = "sync_event_encode_failed", error = %err);
            None
        }
    }
}

/// Keeps the open-subscriber gauge in step with live streams.
struct SubscriberGuard;

impl SubscriberGuard {
    fn open() -> Self {
        metrics::sync_subscriber_opened();
        Self
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        metrics::sync_subscriber_closed();
    }
}

fn sync_response(payload: SyncPayload) -> SyncResponse {
    let profile = ProfileResponse {
        id: payload.profile.id,
        email: payload.profile.email,
        name: payload.profile.full_name,
        public_key: payload.profile.public_key,
        revision_date: payload.profile.revision_date.to_rfc3339(),
    };
    SyncResponse {
        profile,
        ciphers: payload
            .ciphers
            .into_iter()
            .map(|synced| SyncCipherResponse {
                cipher: cipher_response(synced.cipher),
                collection_ids: synced.collection_ids,
                view_password: synced.view_password,
                edit: synced.edit,
            })
            .collect(),
        folders: payload.folders.into_iter().map(folder_response).collect(),
        collections: payload
            .collections
            .into_iter()
            .map(|collection| CollectionResponse {
                id: collection.id,
                team_id: collection.team_id,
                name: collection.name,
                revision_date: collection.revision_date.to_rfc3339(),
            })
            .collect(),
        memberships: payload
            .memberships
            .into_iter()
            .map(|entry| MembershipResponse {
                member_id: entry.membership.id,
                team_id: entry.team.id,
                team_name: entry.team.name,
                role: entry.membership.role,
                status: entry.membership.status,
                hide_passwords: entry.membership.hide_passwords,
                key: entry.membership.key,
                personal_share: entry.team.personal_share,
            })
            .collect(),
    }
}
