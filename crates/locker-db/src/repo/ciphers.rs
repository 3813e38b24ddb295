use super::prelude::*;
use tracing::{instrument, Span};

const CIPHER_COLUMNS: &str = "id, user_id, team_id, folder_id, cipher_type, data, favorite, \
     revision_date, created_at, deleted_at";

pub struct CipherRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CipherRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    #[instrument(
        level = "debug",
        skip(self, cipher),
        fields(
            cipher_id = %cipher.id,
            checksum = %cipher.data_checksum(),
            db.system = "postgresql",
            db.operation = "INSERT",
            db.query = "ciphers.create"
        )
    )]
    pub async fn create(&self, cipher: &Cipher) -> Result<(), sqlx_core::Error> {
        query!(
            r#"
            INSERT INTO ciphers (
                id, user_id, team_id, folder_id, cipher_type, data, favorite,
                revision_date, created_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            cipher.id,
            cipher.user_id,
            cipher.team_id,
            cipher.folder_id,
            cipher.cipher_type.as_i16(),
            cipher.data.as_str(),
            cipher.favorite,
            cipher.revision_date,
            cipher.created_at,
            cipher.deleted_at
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
        fields(cipher_id = %id, db.system = "postgresql", db.operation = "SELECT", db.query = "ciphers.get_by_id")
    )]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Cipher>, sqlx_core::Error> {
        let sql = format!("SELECT {CIPHER_COLUMNS} FROM ciphers WHERE id = $1 AND deleted_at IS NULL");
        query_as!(Cipher, &sql, id).fetch_optional(self.pool).await
    }

    #[instrument(
        level = "debug",
        skip(self, expected, data),
        fields(cipher_id = %expected.id, db.system = "postgresql", db.operation = "UPDATE", db.query = "ciphers.update_data")
    )]
    /// Replaces the encrypted payload, provided the cipher still has the
    /// owner and team recorded in `expected`. Returns the affected row count.
    pub async fn update_data(
        &self,
        expected: &Cipher,
        data: &str,
        favorite: Option<bool>,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            UPDATE ciphers
            SET data = $2, favorite = COALESCE($3, favorite), revision_date = $4
            WHERE id = $1
              AND deleted_at IS NULL
              AND user_id IS NOT DISTINCT FROM $5
              AND team_id IS NOT DISTINCT FROM $6
            "#,
            expected.id,
            data,
            favorite,
            now,
            expected.user_id,
            expected.team_id
        )
        .execute(self.pool)
        .await
        .map(|result| {
            Span::current().record("db.rows", result.rows_affected() as i64);
            result.rows_affected()
        })
    }

    /// Soft-deletes a personal cipher.
    pub async fn delete_personal(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            UPDATE ciphers
            SET deleted_at = $3, revision_date = $3, folder_id = NULL
            WHERE id = $1 AND user_id = $2 AND team_id IS NULL AND deleted_at IS NULL
            "#,
            id,
            user_id,
            now
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    pub async fn set_folder(
        &self,
        id: Uuid,
        user_id: Uuid,
        folder_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            UPDATE ciphers
            SET folder_id = $3, revision_date = $4
            WHERE id = $1 AND user_id = $2 AND team_id IS NULL AND deleted_at IS NULL
            "#,
            id,
            user_id,
            folder_id,
            now
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    #[instrument(
        level = "debug",
        skip(self),
        fields(user_id = %user_id, db.system = "postgresql", db.operation = "SELECT", db.query = "ciphers.list_personal")
    )]
    pub async fn list_personal(&self, user_id: Uuid) -> Result<Vec<Cipher>, sqlx_core::Error> {
        let sql = format!(
            "SELECT {CIPHER_COLUMNS} FROM ciphers \
             WHERE user_id = $1 AND team_id IS NULL AND deleted_at IS NULL \
             ORDER BY created_at ASC"
        );
        let ciphers = query_as!(Cipher, &sql, user_id).fetch_all(self.pool).await?;
        Span::current().record("db.rows", ciphers.len() as i64);
        Ok(ciphers)
    }

    pub async fn list_by_team(&self, team_id: Uuid) -> Result<Vec<Cipher>, sqlx_core::Error> {
        let sql = format!(
            "SELECT {CIPHER_COLUMNS} FROM ciphers \
             WHERE team_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at ASC"
        );
        query_as!(Cipher, &sql, team_id).fetch_all(self.pool).await
    }

    /// Ciphers of every team where the user is a confirmed member.
    #[instrument(
        level = "debug",
        skip(self),
        fields(user_id = %user_id, db.system = "postgresql", db.operation = "SELECT", db.query = "ciphers.list_shared_with")
    )]
    pub async fn list_shared_with(&self, user_id: Uuid) -> Result<Vec<Cipher>, sqlx_core::Error> {
        let sql = r#"
            SELECT c.id, c.user_id, c.team_id, c.folder_id, c.cipher_type, c.data, c.favorite,
                   c.revision_date, c.created_at, c.deleted_at
            FROM ciphers c
            INNER JOIN team_members tm ON tm.team_id = c.team_id
            WHERE tm.user_id = $1 AND tm.status = $2 AND c.deleted_at IS NULL
            ORDER BY c.created_at ASC
        "#;
        let ciphers = query_as!(Cipher, sql, user_id, MemberStatus::Confirmed.as_i16())
            .fetch_all(self.pool)
            .await?;
        Span::current().record("db.rows", ciphers.len() as i64);
        Ok(ciphers)
    }

    /// `(cipher_id, collection_id)` pairs for the given ciphers.
    pub async fn list_collection_links(
        &self,
        cipher_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Uuid)>, sqlx_core::Error> {
        if cipher_ids.is_empty() {
            return Ok(Vec::new());
        }
        query_as!(
            (Uuid, Uuid),
            r#"
            SELECT cipher_id, collection_id
            FROM cipher_collections
            WHERE cipher_id = ANY($1)
            "#,
            cipher_ids
        )
        .fetch_all(self.pool)
        .await
    }
}

pub(crate) async fn lock_cipher(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Cipher>, sqlx_core::Error> {
    let sql = format!(
        "SELECT {CIPHER_COLUMNS} FROM ciphers WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
    );
    query_as!(Cipher, &sql, id).fetch_optional(&mut *conn).await
}

pub(crate) async fn personal_ids_in_folder(
    conn: &mut PgConnection,
    user_id: Uuid,
    folder_id: Uuid,
) -> Result<Vec<Uuid>, sqlx_core::Error> {
    query_scalar!(
        Uuid,
        r#"
        SELECT id
        FROM ciphers
        WHERE user_id = $1 AND folder_id = $2 AND team_id IS NULL AND deleted_at IS NULL
        "#,
        user_id,
        folder_id
    )
    .fetch_all(&mut *conn)
    .await
}

pub(crate) async fn team_cipher_ids(
    conn: &mut PgConnection,
    team_id: Uuid,
) -> Result<Vec<Uuid>, sqlx_core::Error> {
    query_scalar!(
        Uuid,
        r#"
        SELECT id
        FROM ciphers
        WHERE team_id = $1 AND deleted_at IS NULL
        "#,
        team_id
    )
    .fetch_all(&mut *conn)
    .await
}

/// Hands a personal cipher over to a team with data re-encrypted under the
/// team key.
pub(crate) async fn move_to_team(
    conn: &mut PgConnection,
    id: Uuid,
    owner_id: Uuid,
    team_id: Uuid,
    data: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx_core::Error> {
    query!(
        r#"
        UPDATE ciphers
        SET team_id = $3, user_id = NULL, folder_id = NULL, data = $4, revision_date = $5
        WHERE id = $1 AND user_id = $2 AND team_id IS NULL AND deleted_at IS NULL
        "#,
        id,
        owner_id,
        team_id,
        data,
        now
    )
    .execute(&mut *conn)
    .await
    .map(|result| result.rows_affected())
}

pub(crate) async fn move_to_owner(
    conn: &mut PgConnection,
    id: Uuid,
    team_id: Uuid,
    owner_id: Uuid,
    folder_id: Option<Uuid>,
    data: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx_core::Error> {
    query!(
        r#"
        UPDATE ciphers
        SET user_id = $3, team_id = NULL, folder_id = $4, data = $5, revision_date = $6
        WHERE id = $1 AND team_id = $2
        "#,
        id,
        team_id,
        owner_id,
        folder_id,
        data,
        now
    )
    .execute(&mut *conn)
    .await
    .map(|result| result.rows_affected())
}

pub(crate) async fn replace_collections(
    conn: &mut PgConnection,
    cipher_id: Uuid,
    collection_ids: &[Uuid],
) -> Result<(), sqlx_core::Error> {
    query!(
        r#"
        DELETE FROM cipher_collections
        WHERE cipher_id = $1
        "#,
        cipher_id
    )
    .execute(&mut *conn)
    .await?;
    if collection_ids.is_empty() {
        return Ok(());
    }
    query!(
        r#"
        INSERT INTO cipher_collections (cipher_id, collection_id)
        SELECT $1, UNNEST($2::uuid[])
        ON CONFLICT DO NOTHING
        "#,
        cipher_id,
        collection_ids
    )
    .execute(&mut *conn)
    .await
    .map(|_| ())
}
