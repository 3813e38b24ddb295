//! Transaction-scoped sharing operations.
//!
//! Every function here expects the caller to have opened a transaction and
//! to commit it afterwards. Rule checks come from `locker_core::sharing` and
//! are re-evaluated on rows locked inside the transaction.

use locker_core::sharing::{
    check_member_removal, check_member_update, check_transition, covers_exactly, single_owner,
    validate_collection_subset, GroupInvite, InviteOutcome, MemberInvite, SharingViolation,
};
use sqlx_core::from_row::FromRow;
use sqlx_core::row::Row;
use sqlx_postgres::PgRow;
use tracing::{instrument, Span};

use super::ciphers::{
    lock_cipher, move_to_owner, move_to_team, personal_ids_in_folder, replace_collections,
    team_cipher_ids,
};
use super::folders::insert_folder;
use super::groups::{
    delete_group_member, group_user_ids, insert_group_member, is_group_member, team_links_for_group,
};
use super::prelude::*;
use super::teams::{
    collection_ids, delete_member, find_member, insert_collection, insert_member, insert_team,
    list_members, lock_member, lock_team, touch_team, upsert_team_group, MEMBER_COLUMNS,
};
use super::users::{find_by_email, insert_user};

#[derive(Debug)]
pub enum SharingTxError {
    Db(sqlx_core::Error),
    Rejected(&'static str),
    Conflict(&'static str),
    Forbidden,
    NotFound,
}

impl std::fmt::Display for SharingTxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Rejected(code) => write!(f, "rejected: {code}"),
            Self::Conflict(code) => write!(f, "conflict: {code}"),
            Self::Forbidden => f.write_str("forbidden"),
            Self::NotFound => f.write_str("not found"),
        }
    }
}

impl std::error::Error for SharingTxError {}

impl From<sqlx_core::Error> for SharingTxError {
    fn from(err: sqlx_core::Error) -> Self {
        Self::Db(err)
    }
}

impl From<SharingViolation> for SharingTxError {
    fn from(violation: SharingViolation) -> Self {
        Self::Rejected(violation.code())
    }
}

/// What is being shared when a personal share is created.
#[derive(Debug, Clone)]
pub enum ShareSource {
    Cipher {
        cipher_id: Uuid,
        data: String,
    },
    Folder {
        folder_id: Uuid,
        folder_name: String,
        ciphers: Vec<(Uuid, String)>,
    },
}

#[derive(Debug, Clone)]
pub struct NewShare {
    pub owner_id: Uuid,
    pub owner_email: String,
    pub team_name: String,
    pub team_key: String,
    pub source: ShareSource,
    pub invites: Vec<MemberInvite>,
    pub groups: Vec<GroupInvite>,
    pub allow_email_invites: bool,
    pub group_admin: bool,
    pub now: DateTime<Utc>,
}

/// Who sends a batch of invitations and what they may do.
///
/// Inviting a group requires the inviter to belong to it, unless the
/// inviter administers groups.
#[derive(Debug, Clone, Copy)]
pub struct InvitePolicy {
    pub inviter_id: Uuid,
    pub group_admin: bool,
    pub allow_email_invites: bool,
}

#[derive(Debug, Clone)]
pub struct InvitedMember {
    pub member: TeamMember,
    pub outcome: InviteOutcome,
}

#[derive(Debug, Clone)]
pub struct CreatedShare {
    pub team: Team,
    pub owner: TeamMember,
    pub collection: Option<Collection>,
    pub cipher_ids: Vec<Uuid>,
    pub invited: Vec<InvitedMember>,
}

#[derive(Debug, Clone)]
pub struct InvitationResponse {
    pub member: TeamMember,
    pub owner_id: Uuid,
    pub accepted: bool,
}

#[derive(Debug, Clone)]
pub struct StoppedShare {
    pub owner_id: Uuid,
    pub member_user_ids: Vec<Uuid>,
    pub cipher_ids: Vec<Uuid>,
    pub folder: Option<Folder>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupMembershipChange {
    pub changed: bool,
    pub memberships: Vec<TeamMember>,
    pub owner_ids: Vec<Uuid>,
}

/// Creates a personal share: team, owner membership, optional collection,
/// moved ciphers and the initial invitations.
#[instrument(
    level = "debug",
    skip(conn, share),
    fields(owner_id = %share.owner_id, db.system = "postgresql", db.operation = "TRANSACTION", db.query = "sharing.create_share")
)]
pub async fn create_share(
    conn: &mut PgConnection,
    share: NewShare,
) -> Result<CreatedShare, SharingTxError> {
    if share.invites.is_empty() && share.groups.is_empty() {
        return Err(SharingViolation::MembersRequired.into());
    }
    let now = share.now;
    let team = Team {
        id: Uuid::now_v7(),
        name: share.team_name.clone(),
        description: None,
        personal_share: true,
        locked: false,
        key: Some(share.team_key.clone()),
        revision_date: now,
        created_at: now,
    };

    let (moves, collection, folder_to_delete) = match share.source {
        ShareSource::Cipher { cipher_id, data } => {
            let cipher = lock_cipher(conn, cipher_id)
                .await?
                .ok_or(SharingTxError::NotFound)?;
            if cipher.team_id.is_some() {
                return Err(SharingTxError::Rejected("cipher_in_organization"));
            }
            if !cipher.is_owned_by(share.owner_id) {
                return Err(SharingTxError::NotFound);
            }
            (vec![(cipher_id, data)], None, None)
        }
        ShareSource::Folder {
            folder_id,
            folder_name,
            ciphers,
        } => {
            let owns_folder = query_scalar!(
                Uuid,
                r#"
                SELECT id
                FROM folders
                WHERE id = $1 AND user_id = $2
                FOR UPDATE
                "#,
                folder_id,
                share.owner_id
            )
            .fetch_optional(&mut *conn)
            .await?;
            if owns_folder.is_none() {
                return Err(SharingTxError::NotFound);
            }
            let existing = personal_ids_in_folder(conn, share.owner_id, folder_id).await?;
            let provided: Vec<Uuid> = ciphers.iter().map(|(id, _)| *id).collect();
            if !covers_exactly(&existing, &provided) {
                return Err(SharingTxError::Rejected("folder_ciphers_mismatch"));
            }
            let collection = Collection {
                id: Uuid::now_v7(),
                team_id: team.id,
                name: folder_name,
                revision_date: now,
                created_at: now,
            };
            (ciphers, Some(collection), Some(folder_id))
        }
    };

    insert_team(conn, &team).await?;
    let owner = TeamMember {
        id: Uuid::now_v7(),
        team_id: team.id,
        user_id: Some(share.owner_id),
        email: Some(share.owner_email.clone()),
        role: TeamMemberRole::Owner,
        status: MemberStatus::Confirmed,
        hide_passwords: false,
        key: Some(share.team_key.clone()),
        access_time: Some(now),
        group_id: None,
        created_at: now,
    };
    insert_member(conn, &owner).await?;
    if let Some(collection) = collection.as_ref() {
        insert_collection(conn, collection).await?;
    }

    let mut cipher_ids = Vec::with_capacity(moves.len());
    for (cipher_id, data) in &moves {
        let moved = move_to_team(conn, *cipher_id, share.owner_id, team.id, data, now).await?;
        if moved == 0 {
            return Err(SharingTxError::Conflict("cipher_changed"));
        }
        if let Some(collection) = collection.as_ref() {
            replace_collections(conn, *cipher_id, &[collection.id]).await?;
        }
        cipher_ids.push(*cipher_id);
    }
    if let Some(folder_id) = folder_to_delete {
        query!(
            r#"
            DELETE FROM folders
            WHERE id = $1 AND user_id = $2
            "#,
            folder_id,
            share.owner_id
        )
        .execute(&mut *conn)
        .await?;
    }

    let policy = InvitePolicy {
        inviter_id: share.owner_id,
        group_admin: share.group_admin,
        allow_email_invites: share.allow_email_invites,
    };
    let invited = invite_members(
        conn,
        &team,
        share.owner_id,
        policy,
        share.invites,
        share.groups,
        now,
    )
    .await?;
    Span::current().record("db.rows", invited.len() as i64);

    Ok(CreatedShare {
        team,
        owner,
        collection,
        cipher_ids,
        invited,
    })
}

/// Invites users (by email) and groups into a team.
///
/// Re-inviting someone who already holds a membership leaves the row
/// untouched and reports [`InviteOutcome::AlreadyMember`].
pub async fn invite_members(
    conn: &mut PgConnection,
    team: &Team,
    owner_id: Uuid,
    policy: InvitePolicy,
    invites: Vec<MemberInvite>,
    groups: Vec<GroupInvite>,
    now: DateTime<Utc>,
) -> Result<Vec<InvitedMember>, SharingTxError> {
    let mut result = Vec::with_capacity(invites.len());
    for invite in invites {
        let user = find_by_email(conn, &invite.email).await?;
        if user.as_ref().is_some_and(|user| user.id == owner_id) {
            continue;
        }
        let existing = match user.as_ref() {
            Some(user) => member_for_user(conn, team.id, user.id).await?,
            None => member_for_email(conn, team.id, &invite.email).await?,
        };
        if let Some(member) = existing {
            result.push(InvitedMember {
                member,
                outcome: InviteOutcome::AlreadyMember,
            });
            continue;
        }
        if user.is_none() && !policy.allow_email_invites {
            return Err(SharingTxError::Rejected("user_not_found"));
        }
        let member = TeamMember {
            id: Uuid::now_v7(),
            team_id: team.id,
            user_id: user.as_ref().map(|user| user.id),
            email: Some(invite.email),
            role: invite.role,
            status: MemberStatus::Invited,
            hide_passwords: invite.hide_passwords,
            key: invite.key,
            access_time: None,
            group_id: None,
            created_at: now,
        };
        insert_member(conn, &member).await?;
        result.push(InvitedMember {
            member,
            outcome: InviteOutcome::Created,
        });
    }

    for group in groups {
        if group.role == TeamMemberRole::Owner {
            return Err(SharingViolation::OwnerRoleNotAssignable.into());
        }
        let exists = query_scalar!(
            Uuid,
            r#"
            SELECT id
            FROM groups
            WHERE id = $1
            "#,
            group.group_id
        )
        .fetch_optional(&mut *conn)
        .await?;
        if exists.is_none() {
            return Err(SharingTxError::NotFound);
        }
        if !policy.group_admin && !is_group_member(conn, group.group_id, policy.inviter_id).await? {
            return Err(SharingTxError::Forbidden);
        }
        let link = TeamGroup {
            team_id: team.id,
            group_id: group.group_id,
            role: group.role,
            hide_passwords: group.hide_passwords,
            created_at: now,
        };
        upsert_team_group(conn, &link).await?;
        for user_id in group_user_ids(conn, group.group_id).await? {
            if user_id == owner_id {
                continue;
            }
            result.push(invite_from_group(conn, &link, user_id, now).await?);
        }
    }

    touch_team(conn, team.id, now).await?;
    Ok(result)
}

async fn invite_from_group(
    conn: &mut PgConnection,
    link: &TeamGroup,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<InvitedMember, SharingTxError> {
    if let Some(member) = member_for_user(conn, link.team_id, user_id).await? {
        return Ok(InvitedMember {
            member,
            outcome: InviteOutcome::AlreadyMember,
        });
    }
    let email = query_scalar!(
        String,
        r#"
        SELECT email
        FROM users
        WHERE id = $1
        "#,
        user_id
    )
    .fetch_one(&mut *conn)
    .await?;
    let member = TeamMember {
        id: Uuid::now_v7(),
        team_id: link.team_id,
        user_id: Some(user_id),
        email: Some(email),
        role: link.role,
        status: MemberStatus::Invited,
        hide_passwords: link.hide_passwords,
        key: None,
        access_time: None,
        group_id: Some(link.group_id),
        created_at: now,
    };
    insert_member(conn, &member).await?;
    Ok(InvitedMember {
        member,
        outcome: InviteOutcome::Created,
    })
}

async fn member_for_user(
    conn: &mut PgConnection,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<Option<TeamMember>, sqlx_core::Error> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 AND user_id = $2 FOR UPDATE"
    );
    query_as!(TeamMember, &sql, team_id, user_id)
        .fetch_optional(&mut *conn)
        .await
}

async fn member_for_email(
    conn: &mut PgConnection,
    team_id: Uuid,
    email: &str,
) -> Result<Option<TeamMember>, sqlx_core::Error> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 AND email = $2 FOR UPDATE"
    );
    query_as!(TeamMember, &sql, team_id, email)
        .fetch_optional(&mut *conn)
        .await
}

/// Locks the team and returns it together with its owner membership.
pub async fn lock_team_with_owner(
    conn: &mut PgConnection,
    team_id: Uuid,
) -> Result<(Team, TeamMember, Vec<TeamMember>), SharingTxError> {
    let team = lock_team(conn, team_id)
        .await?
        .ok_or(SharingTxError::NotFound)?;
    let members = list_members(conn, team_id).await?;
    let owner = single_owner(&members)?.clone();
    Ok((team, owner, members))
}

/// Personal shares accept new ciphers and members until they are locked.
pub fn ensure_open_personal_share(team: &Team) -> Result<(), SharingTxError> {
    if !team.personal_share {
        return Err(SharingTxError::Rejected("not_personal_share"));
    }
    if team.locked {
        return Err(SharingTxError::Rejected("team_locked"));
    }
    Ok(())
}

#[instrument(
    level = "debug",
    skip(conn),
    fields(member_id = %member_id, db.system = "postgresql", db.operation = "TRANSACTION", db.query = "sharing.respond_invitation")
)]
pub async fn respond_invitation(
    conn: &mut PgConnection,
    member_id: Uuid,
    user_id: Uuid,
    accept: bool,
    now: DateTime<Utc>,
) -> Result<InvitationResponse, SharingTxError> {
    // Team row first, then the member row, like every other member operation.
    let team_id = find_member(conn, member_id)
        .await?
        .filter(|member| member.belongs_to(user_id))
        .map(|member| member.team_id)
        .ok_or(SharingTxError::NotFound)?;
    let (_, owner, _) = lock_team_with_owner(conn, team_id).await?;
    let owner_id = owner.user_id.ok_or(SharingTxError::NotFound)?;
    let mut member = lock_member(conn, member_id)
        .await?
        .filter(|member| member.team_id == team_id && member.belongs_to(user_id))
        .ok_or(SharingTxError::NotFound)?;
    check_transition(member.status, MemberStatus::Accepted)?;

    if accept {
        query!(
            r#"
            UPDATE team_members
            SET status = $2, access_time = $3
            WHERE id = $1
            "#,
            member.id,
            MemberStatus::Accepted.as_i16(),
            now
        )
        .execute(&mut *conn)
        .await?;
        member.status = MemberStatus::Accepted;
        member.access_time = Some(now);
    } else {
        delete_member(conn, member.id).await?;
    }
    touch_team(conn, member.team_id, now).await?;

    Ok(InvitationResponse {
        member,
        owner_id,
        accepted: accept,
    })
}

/// Stores the team key wrapped for an accepted member. Returns the member and
/// the team owner's user id.
pub async fn confirm_member(
    conn: &mut PgConnection,
    team_id: Uuid,
    actor_id: Uuid,
    member_id: Uuid,
    key: &str,
    now: DateTime<Utc>,
) -> Result<(TeamMember, Uuid), SharingTxError> {
    let (_, owner_id, _) = lock_acting_manager(conn, team_id, actor_id).await?;
    let mut member = lock_member(conn, member_id)
        .await?
        .ok_or(SharingTxError::NotFound)?;
    if member.team_id != team_id {
        return Err(SharingTxError::NotFound);
    }
    check_transition(member.status, MemberStatus::Confirmed)?;
    query!(
        r#"
        UPDATE team_members
        SET status = $2, key = $3
        WHERE id = $1
        "#,
        member.id,
        MemberStatus::Confirmed.as_i16(),
        key
    )
    .execute(&mut *conn)
    .await?;
    touch_team(conn, team_id, now).await?;
    member.status = MemberStatus::Confirmed;
    member.key = Some(key.to_string());
    Ok((member, owner_id))
}

/// Locks the team, then the acting member's row, and returns the team, its
/// owner's user id and the actor's current membership. Fails unless that
/// membership is confirmed and may manage members.
pub async fn lock_acting_manager(
    conn: &mut PgConnection,
    team_id: Uuid,
    actor_id: Uuid,
) -> Result<(Team, Uuid, TeamMember), SharingTxError> {
    let (team, owner, _) = lock_team_with_owner(conn, team_id).await?;
    let owner_id = owner.user_id.ok_or(SharingTxError::NotFound)?;
    let actor = member_for_user(conn, team_id, actor_id)
        .await?
        .ok_or(SharingTxError::NotFound)?;
    if actor.status != MemberStatus::Confirmed || !actor.role.can_manage_members() {
        return Err(SharingViolation::InsufficientRole.into());
    }
    Ok((team, owner_id, actor))
}

/// Changes a member's role or password visibility. Returns the updated
/// member and the team owner's user id.
pub async fn update_member(
    conn: &mut PgConnection,
    team_id: Uuid,
    actor_id: Uuid,
    member_id: Uuid,
    role: Option<TeamMemberRole>,
    hide_passwords: Option<bool>,
    now: DateTime<Utc>,
) -> Result<(TeamMember, Uuid), SharingTxError> {
    let (_, owner_id, actor) = lock_acting_manager(conn, team_id, actor_id).await?;
    let mut target = lock_member(conn, member_id)
        .await?
        .ok_or(SharingTxError::NotFound)?;
    if target.team_id != team_id {
        return Err(SharingTxError::NotFound);
    }
    check_member_update(&actor, &target, role)?;
    if let Some(role) = role {
        target.role = role;
    }
    if let Some(hide_passwords) = hide_passwords {
        target.hide_passwords = hide_passwords;
    }
    query!(
        r#"
        UPDATE team_members
        SET role = $2, hide_passwords = $3
        WHERE id = $1
        "#,
        target.id,
        target.role.as_i16(),
        target.hide_passwords
    )
    .execute(&mut *conn)
    .await?;
    touch_team(conn, team_id, now).await?;
    Ok((target, owner_id))
}

/// Removes a member on behalf of a manager. Returns the removed member and
/// the team owner's user id.
pub async fn remove_member(
    conn: &mut PgConnection,
    team_id: Uuid,
    actor_id: Uuid,
    member_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(TeamMember, Uuid), SharingTxError> {
    let (_, owner_id, actor) = lock_acting_manager(conn, team_id, actor_id).await?;
    let target = lock_member(conn, member_id)
        .await?
        .ok_or(SharingTxError::NotFound)?;
    if target.team_id != team_id {
        return Err(SharingTxError::NotFound);
    }
    check_member_removal(&actor, &target)?;
    delete_member(conn, target.id).await?;
    touch_team(conn, team_id, now).await?;
    Ok((target, owner_id))
}

/// Removes the caller's own membership. Returns the membership and the
/// team owner's user id.
pub async fn leave_team(
    conn: &mut PgConnection,
    team_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(TeamMember, Uuid), SharingTxError> {
    let (_, owner, members) = lock_team_with_owner(conn, team_id).await?;
    let member = members
        .into_iter()
        .find(|member| member.belongs_to(user_id))
        .ok_or(SharingTxError::NotFound)?;
    if member.is_owner() {
        return Err(SharingTxError::Rejected("owner_cannot_leave"));
    }
    delete_member(conn, member.id).await?;
    touch_team(conn, team_id, now).await?;
    let owner_id = owner.user_id.ok_or(SharingTxError::NotFound)?;
    Ok((member, owner_id))
}

/// Moves every team cipher back to the owner and deletes the team.
#[instrument(
    level = "debug",
    skip(conn, ciphers, folder_name),
    fields(team_id = %team_id, db.system = "postgresql", db.operation = "TRANSACTION", db.query = "sharing.stop_sharing")
)]
pub async fn stop_sharing(
    conn: &mut PgConnection,
    team_id: Uuid,
    owner_id: Uuid,
    ciphers: Vec<(Uuid, String)>,
    folder_name: Option<String>,
    now: DateTime<Utc>,
) -> Result<StoppedShare, SharingTxError> {
    let (team, owner, members) = lock_team_with_owner(conn, team_id).await?;
    if !owner.belongs_to(owner_id) {
        return Err(SharingTxError::Rejected("owner_required"));
    }
    if !team.personal_share {
        return Err(SharingTxError::Rejected("not_personal_share"));
    }
    let existing = team_cipher_ids(conn, team_id).await?;
    let provided: Vec<Uuid> = ciphers.iter().map(|(id, _)| *id).collect();
    if !covers_exactly(&existing, &provided) {
        return Err(SharingTxError::Rejected("stop_share_ciphers_mismatch"));
    }

    let folder = match folder_name {
        Some(name) if !name.trim().is_empty() => {
            let folder = Folder {
                id: Uuid::now_v7(),
                user_id: owner_id,
                name,
                revision_date: now,
                created_at: now,
            };
            insert_folder(conn, &folder).await?;
            Some(folder)
        }
        _ => None,
    };

    for (cipher_id, data) in &ciphers {
        move_to_owner(
            conn,
            *cipher_id,
            team_id,
            owner_id,
            folder.as_ref().map(|folder| folder.id),
            data,
            now,
        )
        .await?;
        replace_collections(conn, *cipher_id, &[]).await?;
    }
    query!(
        r#"
        DELETE FROM teams
        WHERE id = $1
        "#,
        team_id
    )
    .execute(&mut *conn)
    .await?;

    let member_user_ids = members
        .iter()
        .filter(|member| !member.is_owner())
        .filter_map(|member| member.user_id)
        .collect();
    Ok(StoppedShare {
        owner_id,
        member_user_ids,
        cipher_ids: provided,
        folder,
    })
}

/// Replaces the collections of a team cipher. Returns the accepted ids.
pub async fn set_cipher_collections(
    conn: &mut PgConnection,
    cipher_id: Uuid,
    team_id: Uuid,
    requested: &[Uuid],
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>, SharingTxError> {
    let cipher = lock_cipher(conn, cipher_id)
        .await?
        .ok_or(SharingTxError::NotFound)?;
    if cipher.team_id != Some(team_id) {
        return Err(SharingTxError::Conflict("cipher_changed"));
    }
    let team_collections = collection_ids(conn, team_id).await?;
    let accepted = validate_collection_subset(requested, &team_collections)?;
    if accepted.is_empty() && !team_collections.is_empty() {
        return Err(SharingTxError::Rejected("collections_required"));
    }
    replace_collections(conn, cipher_id, &accepted).await?;
    query!(
        r#"
        UPDATE ciphers
        SET revision_date = $2
        WHERE id = $1
        "#,
        cipher_id,
        now
    )
    .execute(&mut *conn)
    .await?;
    Ok(accepted)
}

/// Moves one personal cipher into an existing shared folder.
pub async fn add_cipher_to_share(
    conn: &mut PgConnection,
    team_id: Uuid,
    collection_id: Uuid,
    cipher_id: Uuid,
    owner_id: Uuid,
    data: &str,
    now: DateTime<Utc>,
) -> Result<(), SharingTxError> {
    let (team, _, _) = lock_acting_manager(conn, team_id, owner_id).await?;
    ensure_open_personal_share(&team)?;
    let team_collections = collection_ids(conn, team_id).await?;
    if !team_collections.contains(&collection_id) {
        return Err(SharingTxError::NotFound);
    }
    let cipher = lock_cipher(conn, cipher_id)
        .await?
        .ok_or(SharingTxError::NotFound)?;
    if cipher.team_id.is_some() {
        return Err(SharingTxError::Rejected("cipher_in_organization"));
    }
    if !cipher.is_owned_by(owner_id) {
        return Err(SharingTxError::NotFound);
    }
    if move_to_team(conn, cipher_id, owner_id, team_id, data, now).await? == 0 {
        return Err(SharingTxError::Conflict("cipher_changed"));
    }
    replace_collections(conn, cipher_id, &[collection_id]).await?;
    touch_team(conn, team_id, now).await?;
    Ok(())
}

/// Adds a user to a group and invites them to every team linked to it.
pub async fn add_group_member(
    conn: &mut PgConnection,
    group_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<GroupMembershipChange, SharingTxError> {
    let inserted = insert_group_member(
        conn,
        &GroupMember {
            group_id,
            user_id,
            created_at: now,
        },
    )
    .await?;
    if !inserted {
        return Ok(GroupMembershipChange::default());
    }
    let mut change = GroupMembershipChange {
        changed: true,
        ..GroupMembershipChange::default()
    };
    let mut links = team_links_for_group(conn, group_id).await?;
    links.sort_by_key(|link| link.team_id);
    for link in links {
        let (team, owner, _) = lock_team_with_owner(conn, link.team_id).await?;
        if team.locked || owner.belongs_to(user_id) {
            continue;
        }
        let invited = invite_from_group(conn, &link, user_id, now).await?;
        if invited.outcome == InviteOutcome::Created {
            touch_team(conn, team.id, now).await?;
            change.memberships.push(invited.member);
            change.owner_ids.extend(owner.user_id);
        }
    }
    Ok(change)
}

/// Removes a user from a group together with the memberships that group
/// produced. Owner memberships are never touched.
pub async fn remove_group_member(
    conn: &mut PgConnection,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<GroupMembershipChange, SharingTxError> {
    let deleted = delete_group_member(conn, group_id, user_id).await?;
    if deleted == 0 {
        return Err(SharingTxError::NotFound);
    }
    let affected_teams = query_scalar!(
        Uuid,
        r#"
        SELECT DISTINCT team_id
        FROM team_members
        WHERE user_id = $1 AND group_id = $2
        ORDER BY team_id
        "#,
        user_id,
        group_id
    )
    .fetch_all(&mut *conn)
    .await?;
    for team_id in affected_teams {
        lock_team(conn, team_id).await?;
    }
    let sql = format!(
        "DELETE FROM team_members WHERE user_id = $1 AND group_id = $2 AND role <> $3 \
         RETURNING {MEMBER_COLUMNS}"
    );
    let memberships = query_as!(
        TeamMember,
        &sql,
        user_id,
        group_id,
        TeamMemberRole::Owner.as_i16()
    )
    .fetch_all(&mut *conn)
    .await?;
    let team_ids: Vec<Uuid> = memberships.iter().map(|member| member.team_id).collect();
    let owner_ids = owners_of(conn, &team_ids).await?;
    Ok(GroupMembershipChange {
        changed: true,
        memberships,
        owner_ids,
    })
}

/// Inserts a new user and attaches email-only invitations addressed to it.
pub async fn create_user_claiming_invites(
    conn: &mut PgConnection,
    user: &User,
) -> Result<(Vec<TeamMember>, Vec<Uuid>), SharingTxError> {
    if find_by_email(conn, &user.email).await?.is_some() {
        return Err(SharingTxError::Conflict("email_taken"));
    }
    insert_user(conn, user).await?;
    let sql = format!(
        "UPDATE team_members SET user_id = $1 WHERE email = $2 AND user_id IS NULL \
         RETURNING {MEMBER_COLUMNS}"
    );
    let claimed = query_as!(TeamMember, &sql, user.id, user.email.as_str())
        .fetch_all(&mut *conn)
        .await?;
    let team_ids: Vec<Uuid> = claimed.iter().map(|member| member.team_id).collect();
    let owner_ids = owners_of(conn, &team_ids).await?;
    Ok((claimed, owner_ids))
}

async fn owners_of(
    conn: &mut PgConnection,
    team_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx_core::Error> {
    if team_ids.is_empty() {
        return Ok(Vec::new());
    }
    query_scalar!(
        Uuid,
        r#"
        SELECT DISTINCT user_id
        FROM team_members
        WHERE team_id = ANY($1) AND role = $2 AND user_id IS NOT NULL
        "#,
        team_ids,
        TeamMemberRole::Owner.as_i16()
    )
    .fetch_all(&mut *conn)
    .await
}

/// Pending invitation as shown to the invitee.
#[derive(Debug, Clone)]
pub struct PendingInvitation {
    pub member: TeamMember,
    pub team_name: String,
    pub owner_email: Option<String>,
    pub cipher_id: Option<Uuid>,
    pub collection_name: Option<String>,
}

impl FromRow<'_, PgRow> for PendingInvitation {
    fn from_row(row: &PgRow) -> Result<Self, sqlx_core::Error> {
        Ok(Self {
            member: TeamMember::from_row(row)?,
            team_name: row.try_get("team_name")?,
            owner_email: row.try_get("owner_email")?,
            cipher_id: row.try_get("cipher_id")?,
            collection_name: row.try_get("collection_name")?,
        })
    }
}

pub struct SharingRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SharingRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    #[instrument(
        level = "debug",
        skip(self),
        fields(user_id = %user_id, db.system = "postgresql", db.operation = "SELECT", db.query = "sharing.list_invitations")
    )]
    pub async fn list_invitations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PendingInvitation>, sqlx_core::Error> {
        let invitations = query_as!(
            PendingInvitation,
            r#"
            SELECT
                tm.id, tm.team_id, tm.user_id, tm.email, tm.role, tm.status,
                tm.hide_passwords, tm.key, tm.access_time, tm.group_id, tm.created_at,
                t.name AS team_name,
                owner_user.email AS owner_email,
                (SELECT c.id FROM ciphers c
                 WHERE c.team_id = t.id AND c.deleted_at IS NULL
                 ORDER BY c.created_at ASC LIMIT 1) AS cipher_id,
                (SELECT col.name FROM collections col
                 WHERE col.team_id = t.id
                 ORDER BY col.created_at ASC LIMIT 1) AS collection_name
            FROM team_members tm
            INNER JOIN teams t ON t.id = tm.team_id
            LEFT JOIN team_members owner_tm ON owner_tm.team_id = t.id AND owner_tm.role = $3
            LEFT JOIN users owner_user ON owner_user.id = owner_tm.user_id
            WHERE tm.user_id = $1 AND tm.status = $2
            ORDER BY tm.created_at ASC
            "#,
            user_id,
            MemberStatus::Invited.as_i16(),
            TeamMemberRole::Owner.as_i16()
        )
        .fetch_all(self.pool)
        .await?;
        Span::current().record("db.rows", invitations.len() as i64);
        Ok(invitations)
    }
}
