use super::prelude::*;
use tracing::{instrument, Span};

pub struct FolderRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> FolderRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    #[instrument(
        level = "debug",
        skip(self, folder),
        fields(folder_id = %folder.id, db.system = "postgresql", db.operation = "INSERT", db.query = "folders.create")
    )]
    pub async fn create(&self, folder: &Folder) -> Result<(), sqlx_core::Error> {
        insert_folder(&mut *self.pool.acquire().await?, folder).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Folder>, sqlx_core::Error> {
        query_as!(
            Folder,
            r#"
            SELECT id, user_id, name, revision_date, created_at
            FROM folders
            WHERE id = $1
            "#,
            id
        )
        .fetch_optional(self.pool)
        .await
    }

    #[instrument(
        level = "debug",
        skip(self),
        fields(user_id = %user_id, db.system = "postgresql", db.operation = "SELECT", db.query = "folders.list_by_user")
    )]
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Folder>, sqlx_core::Error> {
        let folders = query_as!(
            Folder,
            r#"
            SELECT id, user_id, name, revision_date, created_at
            FROM folders
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
            user_id
        )
        .fetch_all(self.pool)
        .await?;
        Span::current().record("db.rows", folders.len() as i64);
        Ok(folders)
    }

    pub async fn rename(
        &self,
        id: Uuid,
        user_id: Uuid,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            UPDATE folders
            SET name = $3, revision_date = $4
            WHERE id = $1 AND user_id = $2
            "#,
            id,
            user_id,
            name,
            now
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }

    /// Deletes the folder; its ciphers fall back to no folder.
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<u64, sqlx_core::Error> {
        query!(
            r#"
            DELETE FROM folders
            WHERE id = $1 AND user_id = $2
            "#,
            id,
            user_id
        )
        .execute(self.pool)
        .await
        .map(|result| result.rows_affected())
    }
}

pub(crate) async fn insert_folder(
    conn: &mut PgConnection,
    folder: &Folder,
) -> Result<(), sqlx_core::Error> {
    query!(
        r#"
        INSERT INTO folders (id, user_id, name, revision_date, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
        folder.id,
        folder.user_id,
        folder.name.as_str(),
        folder.revision_date,
        folder.created_at
    )
    .execute(&mut *conn)
    .await
    .map(|result| {
        Span::current().record("db.rows", result.rows_affected() as i64);
    })
}
