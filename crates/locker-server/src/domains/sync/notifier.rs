//! PwdSync fan-out.
//!
//! A notification bumps the sync revision of every addressed user, pokes the
//! open event streams through an in-process broadcast channel and, when a
//! push gateway is configured, wakes their mobile devices.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use locker_core::{SyncEvent, FCM_MAX_REGISTRATION_IDS};
use locker_db::repo::{DeviceRepo, UserRepo};
use locker_db::PgPool;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::infra::metrics;

/// Event as published on the in-process channel, with its recipients.
#[derive(Debug, Clone)]
pub struct SyncEnvelope {
    pub user_ids: Arc<[Uuid]>,
    pub event: SyncEvent,
}

impl SyncEnvelope {
    pub fn addresses(&self, user_id: Uuid) -> bool {
        self.user_ids.contains(&user_id)
    }
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push transport failed: {0}")]
    Transport(String),
    #[error("push rejected with status {0}")]
    Status(u16),
}

#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, registration_ids: &[String], event: &SyncEvent) -> Result<(), PushError>;
}

#[derive(Clone)]
pub struct SyncNotifier {
    db: PgPool,
    sender: broadcast::Sender<SyncEnvelope>,
    push: Option<Arc<dyn PushGateway>>,
}

impl SyncNotifier {
    pub fn new(db: PgPool, capacity: usize, push: Option<Arc<dyn PushGateway>>) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { db, sender, push }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEnvelope> {
        self.sender.subscribe()
    }

    /// Fans `event` out to `users`. Never fails: the mutation that caused the
    /// event is already committed.
    #[tracing::instrument(skip(self, event, users), fields(sync_event = %event.event_type))]
    pub async fn notify<I>(&self, event: SyncEvent, users: I)
    where
        I: IntoIterator<Item = Uuid>,
    {
        let user_ids = dedup_recipients(users);
        if user_ids.is_empty() {
            return;
        }
        metrics::sync_notification(event.event_type.as_str(), user_ids.len());

        if let Err(err) = UserRepo::new(&self.db)
            .bump_revision(&user_ids, event.revision_date)
            .await
        {
            metrics::revision_bump_failed();
            tracing::error!(
                event = "revision_bump_failed",
                error = %err,
                users = user_ids.len(),
                "Failed to bump sync revision"
            );
        }

        let receivers = self.publish(SyncEnvelope {
            user_ids: Arc::from(user_ids.as_slice()),
            event: event.clone(),
        });
        tracing::debug!(
            event = "sync_notified",
            users = user_ids.len(),
            receivers,
            "Sync notification published"
        );

        if let Some(gateway) = self.push.clone() {
            let db = self.db.clone();
            tokio::spawn(async move {
                match DeviceRepo::new(&db).list_fcm_ids(&user_ids).await {
                    Ok(registration_ids) => {
                        deliver_push(gateway.as_ref(), &registration_ids, &event).await;
                    }
                    Err(err) => {
                        metrics::push_delivery("lookup_failed");
                        tracing::error!(
                            event = "push_devices_lookup_failed",
                            error = %err,
                            "Failed to load push registrations"
                        );
                    }
                }
            });
        }
    }

    /// Returns the number of subscribers that received the envelope.
    pub(crate) fn publish(&self, envelope: SyncEnvelope) -> usize {
        self.sender.send(envelope).unwrap_or(0)
    }
}

/// Drops duplicate ids, keeping first-seen order.
pub(crate) fn dedup_recipients<I>(users: I) -> Vec<Uuid>
where
    I: IntoIterator<Item = Uuid>,
{
    let mut seen = HashSet::new();
    users.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Sends one push request per batch of registration ids. Returns the number
/// of batches the gateway accepted.
pub(crate) async fn deliver_push(
    gateway: &dyn PushGateway,
    registration_ids: &[String],
    event: &SyncEvent,
) -> usize {
    let mut delivered = 0;
    for batch in registration_ids.chunks(FCM_MAX_REGISTRATION_IDS) {
        match gateway.send(batch, event).await {
            Ok(()) => {
                metrics::push_delivery("ok");
                delivered += 1;
            }
            Err(err) => {
                metrics::push_delivery("error");
                tracing::warn!(
                    event = "push_delivery_failed",
                    error = %err,
                    batch_size = batch.len(),
                    "Push batch rejected"
                );
            }
        }
    }
    delivered
}
