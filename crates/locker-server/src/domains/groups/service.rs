use chrono::Utc;
use locker_core::{Group, GroupMember, Identity, SyncEvent, SyncEventType};
use locker_db::repo::sharing::{self, GroupMembershipChange};
use locker_db::repo::{GroupMemberRepo, GroupRepo, UserRepo};
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::errors::{db_error, forbidden, ServiceError};
use crate::infra::{audit, db};

#[derive(Debug)]
pub struct GroupWithMembers {
    pub group: Group,
    pub members: Vec<GroupMember>,
}

pub async fn create_group(
    state: &AppState,
    identity: &Identity,
    name: &str,
) -> Result<Group, ServiceError> {
    require_group_admin(state, identity, "create_group")?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::BadRequest("invalid_name"));
    }
    let group = Group {
        id: Uuid::now_v7(),
        name: name.to_string(),
        created_at: Utc::now(),
    };
    GroupRepo::new(&state.db)
        .create(&group)
        .await
        .map_err(|err| db_error("group_create_failed", &err))?;
    audit::groups_event(identity, "create", group.id, None);
    Ok(group)
}

pub async fn list_groups(state: &AppState) -> Result<Vec<GroupWithMembers>, ServiceError> {
    let groups = GroupRepo::new(&state.db)
        .list()
        .await
        .map_err(|err| db_error("groups_list_failed", &err))?;
    let members_repo = GroupMemberRepo::new(&state.db);
    let mut result = Vec::with_capacity(groups.len());
    for group in groups {
        let members = members_repo
            .list_by_group(group.id)
            .await
            .map_err(|err| db_error("group_members_list_failed", &err))?;
        result.push(GroupWithMembers { group, members });
    }
    Ok(result)
}

/// Adds a user to a group and invites them to every share linked to it.
pub async fn add_group_member(
    state: &AppState,
    identity: &Identity,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<GroupMembershipChange, ServiceError> {
    require_group_admin(state, identity, "add_group_member")?;
    ensure_group(state, group_id).await?;
    UserRepo::new(&state.db)
        .get_by_id(user_id)
        .await
        .map_err(|err| db_error("user_get_failed", &err))?
        .ok_or(ServiceError::BadRequest("user_not_found"))?;

    let mut tx = db::begin_tx(state, "group_add_member")
        .await
        .map_err(|_| ServiceError::DbError)?;
    let result = async {
        let change = sharing::add_group_member(&mut tx, group_id, user_id, Utc::now()).await?;
        Ok::<_, ServiceError>(change)
    }
    .await;
    let change = db::settle(tx, result, "group_add_member").await?;
    if !change.changed {
        return Ok(change);
    }

    audit::groups_event(identity, "add_member", group_id, Some(user_id));
    for membership in &change.memberships {
        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingInvitation)
                    .with_team(membership.team_id)
                    .with_member(membership.id)
                    .with_user(user_id),
                [user_id],
            )
            .await;
    }
    if !change.owner_ids.is_empty() {
        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingMemberUpdated).with_user(user_id),
                change.owner_ids.iter().copied(),
            )
            .await;
    }
    Ok(change)
}

/// Removes a user from a group along with the memberships the group granted.
pub async fn remove_group_member(
    state: &AppState,
    identity: &Identity,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<GroupMembershipChange, ServiceError> {
    require_group_admin(state, identity, "remove_group_member")?;
    let mut tx = db::begin_tx(state, "group_remove_member")
        .await
        .map_err(|_| ServiceError::DbError)?;
    let result = async {
        let change = sharing::remove_group_member(&mut tx, group_id, user_id).await?;
        Ok::<_, ServiceError>(change)
    }
    .await;
    let change = db::settle(tx, result, "group_remove_member").await?;

    audit::groups_event(identity, "remove_member", group_id, Some(user_id));
    if !change.memberships.is_empty() {
        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingMemberRemoved).with_user(user_id),
                change.owner_ids.iter().copied().chain([user_id]),
            )
            .await;
    }
    Ok(change)
}

pub(crate) fn is_group_admin(state: &AppState, identity: &Identity) -> bool {
    state
        .config
        .sharing
        .group_admins
        .iter()
        .any(|email| identity.is_email(email))
}

fn require_group_admin(
    state: &AppState,
    identity: &Identity,
    action: &'static str,
) -> Result<(), ServiceError> {
    if is_group_admin(state, identity) {
        Ok(())
    } else {
        Err(forbidden(action, "groups"))
    }
}

async fn ensure_group(state: &AppState, group_id: Uuid) -> Result<(), ServiceError> {
    GroupRepo::new(&state.db)
        .get_by_id(group_id)
        .await
        .map_err(|err| db_error("group_get_failed", &err))?
        .map(|_| ())
        .ok_or(ServiceError::NotFound)
}
