use super::prelude::*;
use tracing::{instrument, Span};

pub(crate) const MEMBER_COLUMNS: &str = "id, team_id, user_id, email, role, status, hide_passwords, key, \
     access_time, group_id, created_at";

pub struct TeamRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TeamRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    #[instrument(
        level = "debug",
        skip(self),
        fields(team_id = %id, db.system = "postgresql", db.operation = "SELECT", db.query = "teams.get_by_id")
    )]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Team>, sqlx_core::Error> {
        query_as!(
            Team,
            r#"
            SELECT id, name, description, personal_share, locked, key, revision_date, created_at
            FROM teams
            WHERE id = $1
            "#,
            id
        )
        .fetch_optional(self.pool)
        .await
    }

    /// Teams where the user holds a membership in one of `statuses`.
    #[instrument(
        level = "debug",
        skip(self, statuses),
        fields(user_id = %user_id, db.system = "postgresql", db.operation = "SELECT", db.query = "teams.list_for_user")
    )]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        statuses: &[MemberStatus],
    ) -> Result<Vec<Team>, sqlx_core::Error> {
        let statuses: Vec<i16> = statuses.iter().map(|status| status.as_i16()).collect();
        let teams = query_as!(
            Team,
            r#"
            SELECT t.id, t.name, t.description, t.personal_share, t.locked, t.key,
                   t.revision_date, t.created_at
            FROM teams t
            INNER JOIN team_members tm ON tm.team_id = t.id
            WHERE tm.user_id = $1 AND tm.status = ANY($2)
            ORDER BY t.created_at ASC
            "#,
            user_id,
            &statuses
        )
        .fetch_all(self.pool)
        .await?;
        Span::current().record("db.rows", teams.len() as i64);
        Ok(teams)
    }
}

pub struct TeamMemberRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TeamMemberRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<TeamMember>, sqlx_core::Error> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE id = $1");
        query_as!(TeamMember, &sql, id).fetch_optional(self.pool).await
    }

    #[instrument(
        level = "debug",
        skip(self),
        fields(team_id = %team_id, user_id = %user_id, db.system = "postgresql", db.operation = "SELECT", db.query = "team_members.get_for_user")
    )]
    pub async fn get_for_user(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TeamMember>, sqlx_core::Error> {
        let sql =
            format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 AND user_id = $2");
        query_as!(TeamMember, &sql, team_id, user_id)
            .fetch_optional(self.pool)
            .await
    }

    #[instrument(
        level = "debug",
        skip(self),
        fields(team_id = %team_id, db.system = "postgresql", db.operation = "SELECT", db.query = "team_members.list_by_team")
    )]
    pub async fn list_by_team(&self, team_id: Uuid) -> Result<Vec<TeamMember>, sqlx_core::Error> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 ORDER BY role ASC, created_at ASC"
        );
        let members = query_as!(TeamMember, &sql, team_id)
            .fetch_all(self.pool)
            .await?;
        Span::current().record("db.rows", members.len() as i64);
        Ok(members)
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<TeamMember>, sqlx_core::Error> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE user_id = $1 ORDER BY created_at ASC"
        );
        query_as!(TeamMember, &sql, user_id)
            .fetch_all(self.pool)
            .await
    }

    /// User ids of the confirmed members, the audience of cipher changes.
    pub async fn confirmed_user_ids(&self, team_id: Uuid) -> Result<Vec<Uuid>, sqlx_core::Error> {
        query_scalar!(
            Uuid,
            r#"
            SELECT user_id
            FROM team_members
            WHERE team_id = $1 AND user_id IS NOT NULL AND status = $2
            "#,
            team_id,
            MemberStatus::Confirmed.as_i16()
        )
        .fetch_all(self.pool)
        .await
    }
}

pub struct CollectionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CollectionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_team(&self, team_id: Uuid) -> Result<Vec<Collection>, sqlx_core::Error> {
        query_as!(
            Collection,
            r#"
            SELECT id, team_id, name, revision_date, created_at
            FROM collections
            WHERE team_id = $1
            ORDER BY created_at ASC
            "#,
            team_id
        )
        .fetch_all(self.pool)
        .await
    }

    pub async fn list_by_teams(
        &self,
        team_ids: &[Uuid],
    ) -> Result<Vec<Collection>, sqlx_core::Error> {
        if team_ids.is_empty() {
            return Ok(Vec::new());
        }
        query_as!(
            Collection,
            r#"
            SELECT id, team_id, name, revision_date, created_at
            FROM collections
            WHERE team_id = ANY($1)
            ORDER BY created_at ASC
            "#,
            team_ids
        )
        .fetch_all(self.pool)
        .await
    }
}

pub struct TeamGroupRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TeamGroupRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_team(&self, team_id: Uuid) -> Result<Vec<TeamGroup>, sqlx_core::Error> {
        query_as!(
            TeamGroup,
            r#"
            SELECT team_id, group_id, role, hide_passwords, created_at
            FROM team_groups
            WHERE team_id = $1
            ORDER BY created_at ASC
            "#,
            team_id
        )
        .fetch_all(self.pool)
        .await
    }
}

pub(crate) async fn insert_team(conn: &mut PgConnection, team: &Team) -> Result<(), sqlx_core::Error> {
    query!(
        r#"
        INSERT INTO teams (id, name, description, personal_share, locked, key, revision_date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
        team.id,
        team.name.as_str(),
        team.description.as_deref(),
        team.personal_share,
        team.locked,
        team.key.as_deref(),
        team.revision_date,
        team.created_at
    )
    .execute(&mut *conn)
    .await
    .map(|_| ())
}

pub(crate) async fn lock_team(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Team>, sqlx_core::Error> {
    query_as!(
        Team,
        r#"
        SELECT id, name, description, personal_share, locked, key, revision_date, created_at
        FROM teams
        WHERE id = $1
        FOR UPDATE
        "#,
        id
    )
    .fetch_optional(&mut *conn)
    .await
}

pub(crate) async fn touch_team(
    conn: &mut PgConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), sqlx_core::Error> {
    query!(
        r#"
        UPDATE teams
        SET revision_date = $2
        WHERE id = $1
        "#,
        id,
        now
    )
    .execute(&mut *conn)
    .await
    .map(|_| ())
}

pub(crate) async fn insert_member(
    conn: &mut PgConnection,
    member: &TeamMember,
) -> Result<(), sqlx_core::Error> {
    query!(
        r#"
        INSERT INTO team_members (
            id, team_id, user_id, email, role, status, hide_passwords, key,
            access_time, group_id, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
        member.id,
        member.team_id,
        member.user_id,
        member.email.as_deref(),
        member.role.as_i16(),
        member.status.as_i16(),
        member.hide_passwords,
        member.key.as_deref(),
        member.access_time,
        member.group_id,
        member.created_at
    )
    .execute(&mut *conn)
    .await
    .map(|_| ())
}

pub(crate) async fn list_members(
    conn: &mut PgConnection,
    team_id: Uuid,
) -> Result<Vec<TeamMember>, sqlx_core::Error> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 ORDER BY created_at ASC"
    );
    query_as!(TeamMember, &sql, team_id)
        .fetch_all(&mut *conn)
        .await
}

pub(crate) async fn find_member(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<TeamMember>, sqlx_core::Error> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE id = $1");
    query_as!(TeamMember, &sql, id)
        .fetch_optional(&mut *conn)
        .await
}

pub(crate) async fn lock_member(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<TeamMember>, sqlx_core::Error> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE id = $1 FOR UPDATE");
    query_as!(TeamMember, &sql, id)
        .fetch_optional(&mut *conn)
        .await
}

pub(crate) async fn delete_member(conn: &mut PgConnection, id: Uuid) -> Result<u64, sqlx_core::Error> {
    query!(
        r#"
        DELETE FROM team_members
        WHERE id = $1
        "#,
        id
    )
    .execute(&mut *conn)
    .await
    .map(|result| result.rows_affected())
}

pub(crate) async fn insert_collection(
    conn: &mut PgConnection,
    collection: &Collection,
) -> Result<(), sqlx_core::Error> {
    query!(
        r#"
        INSERT INTO collections (id, team_id, name, revision_date, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
        collection.id,
        collection.team_id,
        collection.name.as_str(),
        collection.revision_date,
        collection.created_at
    )
    .execute(&mut *conn)
    .await
    .map(|_| ())
}

pub(crate) async fn collection_ids(
    conn: &mut PgConnection,
    team_id: Uuid,
) -> Result<Vec<Uuid>, sqlx_core::Error> {
    query_scalar!(
        Uuid,
        r#"
        SELECT id
        FROM collections
        WHERE team_id = $1
        "#,
        team_id
    )
    .fetch_all(&mut *conn)
    .await
}

pub(crate) async fn upsert_team_group(
    conn: &mut PgConnection,
    link: &TeamGroup,
) -> Result<(), sqlx_core::Error> {
    query!(
        r#"
        INSERT INTO team_groups (team_id, group_id, role, hide_passwords, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (team_id, group_id) DO UPDATE SET
            role = excluded.role,
            hide_passwords = excluded.hide_passwords
        "#,
        link.team_id,
        link.group_id,
        link.role.as_i16(),
        link.hide_passwords,
        link.created_at
    )
    .execute(&mut *conn)
    .await
    .map(|_| ())
}
