use super::prelude::*;
use tracing::{instrument, Span};

pub struct DeviceRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DeviceRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, device: &Device) -> Result<(), sqlx_core::Error> {
        query!(
            r#"
            INSERT INTO devices (id, user_id, name, fcm_id, last_seen_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
            device.id,
            device.user_id,
            device.name.as_str(),
            device.fcm_id.as_deref(),
            device.last_seen_at,
            device.created_at
        )
        .execute(self.pool)
        .await
        .map(|_| ())
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Device>, sqlx_core::Error> {
        query_as!(
            Device,
            r#"
            SELECT id, user_id, name, fcm_id, last_seen_at, created_at
            FROM devices
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
            user_id
        )
        .fetch_all(self.pool)
        .await
    }

    pub async fn delete(&self, user_id: Uuid, device_id: Uuid) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            DELETE FROM devices
            WHERE id = $1 AND user_id = $2
            "#,
            device_id,
            user_id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    /// Push registration ids of every device owned by the listed users.
    #[instrument(
        level = "debug",
        skip(self, user_ids),
        fields(users = user_ids.len(), db.system = "postgresql", db.operation = "SELECT", db.query = "devices.list_fcm_ids")
    )]
    pub async fn list_fcm_ids(&self, user_ids: &[Uuid]) -> Result<Vec<String>, sqlx_core::Error> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = query_scalar!(
            String,
            r#"
            SELECT DISTINCT fcm_id
            FROM devices
            WHERE user_id = ANY($1) AND fcm_id IS NOT NULL AND fcm_id <> ''
            "#,
            user_ids
        )
        .fetch_all(self.pool)
        .await?;
        Span::current().record("db.rows", ids.len() as i64);
        Ok(ids)
    }
}
