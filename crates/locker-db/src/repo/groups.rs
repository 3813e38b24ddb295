use super::prelude::*;

pub struct GroupRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> GroupRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, group: &Group) -> Result<(), sqlx_core::Error> {
        query!(
            r#"
            INSERT INTO groups (id, name, created_at)
            VALUES ($1, $2, $3)
            "#,
            group.id,
            group.name.as_str(),
            group.created_at
        )
        .execute(self.pool)
        .await
        .map(|_| ())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Group>, sqlx_core::Error> {
        query_as!(
            Group,
            r#"
            SELECT id, name, created_at
            FROM groups
            WHERE id = $1
            "#,
            id
        )
        .fetch_optional(self.pool)
        .await
    }

    pub async fn list(&self) -> Result<Vec<Group>, sqlx_core::Error> {
        query_as!(
            Group,
            r#"
            SELECT id, name, created_at
            FROM groups
            ORDER BY name ASC
            "#
        )
        .fetch_all(self.pool)
        .await
    }
}

pub struct GroupMemberRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> GroupMemberRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_group(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<GroupMember>, sqlx_core::Error> {
        query_as!(
            GroupMember,
            r#"
            SELECT group_id, user_id, created_at
            FROM group_members
            WHERE group_id = $1
            ORDER BY created_at ASC
            "#,
            group_id
        )
        .fetch_all(self.pool)
        .await
    }
}

pub(crate) async fn insert_group_member(
    conn: &mut PgConnection,
    member: &GroupMember,
) -> Result<bool, sqlx_core::Error> {
    query!(
        r#"
        INSERT INTO group_members (group_id, user_id, created_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (group_id, user_id) DO NOTHING
        "#,
        member.group_id,
        member.user_id,
        member.created_at
    )
    .execute(&mut *conn)
    .await
    .map(|result| result.rows_affected() > 0)
}

pub(crate) async fn delete_group_member(
    conn: &mut PgConnection,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<u64, sqlx_core::Error> {
    query!(
        r#"
        DELETE FROM group_members
        WHERE group_id = $1 AND user_id = $2
        "#,
        group_id,
        user_id
    )
    .execute(&mut *conn)
    .await
    .map(|result| result.rows_affected())
}

pub(crate) async fn group_user_ids(
    conn: &mut PgConnection,
    group_id: Uuid,
) -> Result<Vec<Uuid>, sqlx_core::Error> {
    query_scalar!(
        Uuid,
        r#"
        SELECT user_id
        FROM group_members
        WHERE group_id = $1
        "#,
        group_id
    )
    .fetch_all(&mut *conn)
    .await
}

pub(crate) async fn is_group_member(
    conn: &mut PgConnection,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx_core::Error> {
    query_scalar!(
        Uuid,
        r#"
        SELECT user_id
        FROM group_members
        WHERE group_id = $1 AND user_id = $2
        "#,
        group_id,
        user_id
    )
    .fetch_optional(&mut *conn)
    .await
    .map(|found| found.is_some())
}

pub(crate) async fn team_links_for_group(
    conn: &mut PgConnection,
    group_id: Uuid,
) -> Result<Vec<TeamGroup>, sqlx_core::Error> {
    query_as!(
        TeamGroup,
        r#"
        SELECT team_id, group_id, role, hide_passwords, created_at
        FROM team_groups
        WHERE group_id = $1
        "#,
        group_id
    )
    .fetch_all(&mut *conn)
    .await
}
