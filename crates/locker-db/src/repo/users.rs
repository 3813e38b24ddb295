use super::prelude::*;
use tracing::{instrument, Span};

const USER_COLUMNS: &str = "id, email, full_name, public_key, status, revision_date, created_at";

pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    #[instrument(
        level = "debug",
        skip(self, user),
        fields(user_id = %user.id, db.system = "postgresql", db.operation = "INSERT", db.query = "users.create")
    )]
    pub async fn create(&self, user: &User) -> Result<(), sqlx_core::Error> {
        query!(
            r#"
            INSERT INTO users (id, email, full_name, public_key, status, revision_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            user.id,
            user.email.as_str(),
            user.full_name.as_deref(),
            user.public_key.as_deref(),
            user.status.as_i16(),
            user.revision_date,
            user.created_at
        )
        .execute(self.pool)
        .await
        .map(|result| {
            Span::current().record("db.rows", result.rows_affected() as i64);
        })
    }

    #[instrument(
        level = "debug",
        skip(self),
        fields(user_id = %id, db.system = "postgresql", db.operation = "SELECT", db.query = "users.get_by_id")
    )]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx_core::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        query_as!(User, &sql, id).fetch_optional(self.pool).await
    }

    #[instrument(
        level = "debug",
        skip(self),
        fields(db.system = "postgresql", db.operation = "SELECT", db.query = "users.get_by_email")
    )]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx_core::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        query_as!(User, &sql, email).fetch_optional(self.pool).await
    }

    #[instrument(
        level = "debug",
        skip(self, public_key),
        fields(user_id = %id, db.system = "postgresql", db.operation = "UPDATE", db.query = "users.update_public_key")
    )]
    pub async fn update_public_key(
        &self,
        id: Uuid,
        public_key: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            UPDATE users
            SET public_key = $2, revision_date = $3
            WHERE id = $1
            "#,
            id,
            public_key,
            now
        )
        .execute(self.pool)
        .await
        .map(|result| {
            Span::current().record("db.rows", result.rows_affected() as i64);
            result.rows_affected()
        })
    }

    /// Marks the cached sync payload of every listed user as stale.
    #[instrument(
        level = "debug",
        skip(self, ids),
        fields(users = ids.len(), db.system = "postgresql", db.operation = "UPDATE", db.query = "users.bump_revision")
    )]
    pub async fn bump_revision(
        &self,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx_core::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        query!(
            r#"
            UPDATE users
            SET revision_date = $2
            WHERE id = ANY($1)
            "#,
            ids,
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

/// Inserts a user inside an open transaction.
pub(crate) async fn insert_user(conn: &mut PgConnection, user: &User) -> Result<(), sqlx_core::Error> {
    query!(
        r#"
        INSERT INTO users (id, email, full_name, public_key, status, revision_date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
        user.id,
        user.email.as_str(),
        user.full_name.as_deref(),
        user.public_key.as_deref(),
        user.status.as_i16(),
        user.revision_date,
        user.created_at
    )
    .execute(&mut *conn)
    .await
    .map(|_| ())
}

pub(crate) async fn find_by_email(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Option<User>, sqlx_core::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    query_as!(User, &sql, email).fetch_optional(&mut *conn).await
}
