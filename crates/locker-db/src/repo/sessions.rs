use super::prelude::*;
use tracing::{instrument, Span};

pub struct SessionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    #[instrument(
        level = "debug",
        skip(self, session),
        fields(
            session_id = %session.id,
            user_id = %session.user_id,
            db.system = "postgresql",
            db.operation = "INSERT",
            db.query = "sessions.create"
        )
    )]
    pub async fn create(&self, session: &Session) -> Result<(), sqlx_core::Error> {
        query!(
            r#"
            INSERT INTO sessions (id, user_id, access_token_hash, access_expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
            session.id,
            session.user_id,
            session.access_token_hash.as_str(),
            session.access_expires_at,
            session.created_at
        )
        .execute(self.pool)
        .await
        .map(|result| {
            Span::current().record("db.rows", result.rows_affected() as i64);
        })
    }

    #[instrument(
        level = "debug",
        skip(self, token_hash),
        fields(db.system = "postgresql", db.operation = "SELECT", db.query = "sessions.get_by_access_token")
    )]
    pub async fn get_by_access_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, sqlx_core::Error> {
        query_as!(
            Session,
            r#"
            SELECT id, user_id, access_token_hash, access_expires_at, created_at
            FROM sessions
            WHERE access_token_hash = $1
            "#,
            token_hash
        )
        .fetch_optional(self.pool)
        .await
    }

    #[instrument(
        level = "debug",
        skip(self),
        fields(db.system = "postgresql", db.operation = "DELETE", db.query = "sessions.delete_expired")
    )]
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            DELETE FROM sessions
            WHERE access_expires_at < $1
            "#,
            now
        )
        .execute(self.pool)
        .await
        .map(|result| {
            Span::current().record("db.rows", result.rows_affected() as i64);
            result.rows_affected()
        })
    }
}
