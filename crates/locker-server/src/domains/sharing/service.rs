use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use locker_core::sharing::{
    ensure_invitees, plan_invitations, GroupInvite, InvitationPlan, InviteOutcome, MemberInvite,
};
use locker_core::{
    Collection, Identity, MemberStatus, SyncEvent, SyncEventType, Team, TeamGroup, TeamMember,
    TeamMemberRole, DEFAULT_SHARE_TEAM_NAME,
};
use locker_db::repo::sharing::{
    self, InvitationResponse, InvitePolicy, InvitedMember, NewShare, PendingInvitation,
    ShareSource, SharingRepo, SharingTxError, StoppedShare,
};
use locker_db::repo::{
    CipherRepo, CollectionRepo, TeamGroupRepo, TeamMemberRepo, TeamRepo, UserRepo,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::errors::{db_error, forbidden, ServiceError};
use crate::domains::groups::service::is_group_admin;
use crate::infra::{audit, db, metrics};

pub struct ShareCipherCommand {
    pub cipher_id: Uuid,
    pub data: String,
    pub team_key: String,
    pub team_name: Option<String>,
    pub members: Vec<MemberInvite>,
    pub groups: Vec<GroupInvite>,
}

pub struct ShareFolderCommand {
    pub folder_id: Uuid,
    pub folder_name: String,
    pub ciphers: Vec<(Uuid, String)>,
    pub team_key: String,
    pub members: Vec<MemberInvite>,
    pub groups: Vec<GroupInvite>,
}

pub struct StopSharingCommand {
    pub team_id: Uuid,
    pub ciphers: Vec<(Uuid, String)>,
    pub folder_name: Option<String>,
}

pub struct UpdateMemberCommand {
    pub team_id: Uuid,
    pub member_id: Uuid,
    pub role: Option<TeamMemberRole>,
    pub hide_passwords: Option<bool>,
}

/// Result of sharing an item or inviting more people to a share.
#[derive(Debug)]
pub struct ShareResult {
    pub team_id: Uuid,
    pub created: bool,
    pub invited: Vec<InvitedMember>,
}

#[derive(Debug)]
pub struct OwnedShare {
    pub team: Team,
    pub members: Vec<TeamMember>,
    pub groups: Vec<TeamGroup>,
    pub cipher_ids: Vec<Uuid>,
    pub collection: Option<Collection>,
}

#[derive(Debug)]
pub struct JoinedShare {
    pub team: Team,
    pub membership: TeamMember,
}

#[derive(Debug, Default)]
pub struct ShareList {
    pub owned: Vec<OwnedShare>,
    pub joined: Vec<JoinedShare>,
}

pub async fn share_cipher(
    state: &AppState,
    identity: &Identity,
    cmd: ShareCipherCommand,
) -> Result<ShareResult, ServiceError> {
    let cipher_id = cmd.cipher_id;
    tracked(identity, "share_cipher", None, Some(cipher_id), async {
        let plan = plan_for(state, identity, cmd.members, &cmd.groups)?;
        let cipher = CipherRepo::new(&state.db)
            .get_by_id(cipher_id)
            .await
            .map_err(|err| db_error("cipher_get_failed", &err))?
            .ok_or(ServiceError::NotFound)?;
        if let Some(team_id) = cipher.team_id {
            let team = TeamRepo::new(&state.db)
                .get_by_id(team_id)
                .await
                .map_err(|err| db_error("team_get_failed", &err))?
                .ok_or(ServiceError::NotFound)?;
            if !team.personal_share {
                return Err(ServiceError::BadRequest("cipher_in_organization"));
            }
            let membership = TeamMemberRepo::new(&state.db)
                .get_for_user(team_id, identity.user_id)
                .await
                .map_err(|err| db_error("team_member_get_failed", &err))?;
            return match membership {
                Some(member) if member.is_owner() => {
                    invite_into(state, identity, team_id, plan, cmd.groups).await
                }
                Some(_) => Err(forbidden("share", &format!("ciphers/{cipher_id}"))),
                None => Err(ServiceError::NotFound),
            };
        }
        if !cipher.is_owned_by(identity.user_id) {
            return Err(ServiceError::NotFound);
        }
        require_payload(&cmd.data, "invalid_data")?;
        require_payload(&cmd.team_key, "team_key_required")?;

        let team_name = cmd
            .team_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SHARE_TEAM_NAME.to_string());
        let share = NewShare {
            owner_id: identity.user_id,
            owner_email: identity.email.clone(),
            team_name,
            team_key: cmd.team_key,
            source: ShareSource::Cipher {
                cipher_id,
                data: cmd.data,
            },
            invites: plan.invites,
            groups: cmd.groups,
            allow_email_invites: state.config.sharing.allow_email_invites,
            group_admin: is_group_admin(state, identity),
            now: Utc::now(),
        };
        create_share(state, identity, share).await
    })
    .await
}

pub async fn share_folder(
    state: &AppState,
    identity: &Identity,
    cmd: ShareFolderCommand,
) -> Result<ShareResult, ServiceError> {
    let folder_id = cmd.folder_id;
    tracked(identity, "share_folder", None, Some(folder_id), async {
        let plan = plan_for(state, identity, cmd.members, &cmd.groups)?;
        require_payload(&cmd.team_key, "team_key_required")?;
        if cmd.folder_name.trim().is_empty() {
            return Err(ServiceError::BadRequest("invalid_name"));
        }
        for (_, data) in &cmd.ciphers {
            require_payload(data, "invalid_data")?;
        }
        let share = NewShare {
            owner_id: identity.user_id,
            owner_email: identity.email.clone(),
            team_name: cmd.folder_name.clone(),
            team_key: cmd.team_key,
            source: ShareSource::Folder {
                folder_id,
                folder_name: cmd.folder_name,
                ciphers: cmd.ciphers,
            },
            invites: plan.invites,
            groups: cmd.groups,
            allow_email_invites: state.config.sharing.allow_email_invites,
            group_admin: is_group_admin(state, identity),
            now: Utc::now(),
        };
        let result = create_share(state, identity, share).await?;
        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::FolderDelete).with_folder(folder_id),
                [identity.user_id],
            )
            .await;
        Ok(result)
    })
    .await
}

pub async fn list_invitations(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<PendingInvitation>, ServiceError> {
    SharingRepo::new(&state.db)
        .list_invitations(identity.user_id)
        .await
        .map_err(|err| db_error("invitations_list_failed", &err))
}

pub async fn respond_invitation(
    state: &AppState,
    identity: &Identity,
    member_id: Uuid,
    accept: bool,
) -> Result<InvitationResponse, ServiceError> {
    let action = if accept {
        "accept_invitation"
    } else {
        "reject_invitation"
    };
    tracked(identity, action, None, Some(member_id), async {
        let mut tx = begin(state, "sharing_respond_invitation").await?;
        let result = async {
            let response = sharing::respond_invitation(
                &mut tx,
                member_id,
                identity.user_id,
                accept,
                Utc::now(),
            )
            .await?;
            Ok::<_, ServiceError>(response)
        }
        .await;
        let response = db::settle(tx, result, "sharing_respond_invitation").await?;

        let event_type = if accept {
            SyncEventType::SharingAccepted
        } else {
            SyncEventType::SharingRejected
        };
        state
            .notifier
            .notify(
                SyncEvent::new(event_type)
                    .with_team(response.member.team_id)
                    .with_member(response.member.id)
                    .with_user(identity.user_id),
                [identity.user_id, response.owner_id],
            )
            .await;
        Ok(response)
    })
    .await
}

/// Public key of a member's account, used by the owner to wrap the team key.
pub async fn member_public_key(
    state: &AppState,
    identity: &Identity,
    team_id: Uuid,
    member_id: Uuid,
) -> Result<String, ServiceError> {
    require_manager(state, identity, team_id, "read_public_key").await?;
    let member = TeamMemberRepo::new(&state.db)
        .get_by_id(member_id)
        .await
        .map_err(|err| db_error("team_member_get_failed", &err))?
        .filter(|member| member.team_id == team_id)
        .ok_or(ServiceError::NotFound)?;
    let Some(user_id) = member.user_id else {
        return Err(ServiceError::BadRequest("public_key_missing"));
    };
    UserRepo::new(&state.db)
        .get_by_id(user_id)
        .await
        .map_err(|err| db_error("user_get_failed", &err))?
        .and_then(|user| user.public_key)
        .filter(|key| !key.is_empty())
        .ok_or(ServiceError::BadRequest("public_key_missing"))
}

pub async fn confirm_member(
    state: &AppState,
    identity: &Identity,
    team_id: Uuid,
    member_id: Uuid,
    key: String,
) -> Result<TeamMember, ServiceError> {
    tracked(identity, "confirm_member", Some(team_id), Some(member_id), async {
        require_payload(&key, "invalid_key")?;
        require_manager(state, identity, team_id, "confirm_member").await?;
        let mut tx = begin(state, "sharing_confirm_member").await?;
        let result = async {
            let confirmed = sharing::confirm_member(
                &mut tx,
                team_id,
                identity.user_id,
                member_id,
                &key,
                Utc::now(),
            )
            .await?;
            Ok::<_, ServiceError>(confirmed)
        }
        .await;
        let (member, owner_id) = db::settle(tx, result, "sharing_confirm_member").await?;

        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingConfirmed)
                    .with_team(team_id)
                    .with_member(member.id),
                member.user_id.into_iter().chain([owner_id]),
            )
            .await;
        Ok(member)
    })
    .await
}

pub async fn add_members(
    state: &AppState,
    identity: &Identity,
    team_id: Uuid,
    members: Vec<MemberInvite>,
    groups: Vec<GroupInvite>,
) -> Result<ShareResult, ServiceError> {
    tracked(identity, "add_members", Some(team_id), None, async {
        let plan = plan_for(state, identity, members, &groups)?;
        require_manager(state, identity, team_id, "add_members").await?;
        invite_into(state, identity, team_id, plan, groups).await
    })
    .await
}

pub async fn update_member(
    state: &AppState,
    identity: &Identity,
    cmd: UpdateMemberCommand,
) -> Result<TeamMember, ServiceError> {
    let team_id = cmd.team_id;
    tracked(identity, "update_member", Some(team_id), Some(cmd.member_id), async {
        require_manager(state, identity, team_id, "update_member").await?;
        let mut tx = begin(state, "sharing_update_member").await?;
        let result = async {
            let updated = sharing::update_member(
                &mut tx,
                team_id,
                identity.user_id,
                cmd.member_id,
                cmd.role,
                cmd.hide_passwords,
                Utc::now(),
            )
            .await?;
            Ok::<_, ServiceError>(updated)
        }
        .await;
        let (member, owner_id) = db::settle(tx, result, "sharing_update_member").await?;

        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingMemberUpdated)
                    .with_team(team_id)
                    .with_member(member.id),
                member
                    .user_id
                    .into_iter()
                    .chain([owner_id, identity.user_id]),
            )
            .await;
        Ok(member)
    })
    .await
}

pub async fn remove_member(
    state: &AppState,
    identity: &Identity,
    team_id: Uuid,
    member_id: Uuid,
) -> Result<TeamMember, ServiceError> {
    tracked(identity, "remove_member", Some(team_id), Some(member_id), async {
        require_manager(state, identity, team_id, "remove_member").await?;
        let mut tx = begin(state, "sharing_remove_member").await?;
        let result = async {
            let removed =
                sharing::remove_member(&mut tx, team_id, identity.user_id, member_id, Utc::now())
                    .await?;
            Ok::<_, ServiceError>(removed)
        }
        .await;
        let (member, owner_id) = db::settle(tx, result, "sharing_remove_member").await?;

        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingMemberRemoved)
                    .with_team(team_id)
                    .with_member(member.id),
                member
                    .user_id
                    .into_iter()
                    .chain([owner_id, identity.user_id]),
            )
            .await;
        Ok(member)
    })
    .await
}

pub async fn leave_team(
    state: &AppState,
    identity: &Identity,
    team_id: Uuid,
) -> Result<(), ServiceError> {
    tracked(identity, "leave_team", Some(team_id), None, async {
        let mut tx = begin(state, "sharing_leave_team").await?;
        let result = async {
            let left = sharing::leave_team(&mut tx, team_id, identity.user_id, Utc::now()).await?;
            Ok::<_, ServiceError>(left)
        }
        .await;
        let (member, owner_id) = db::settle(tx, result, "sharing_leave_team").await?;

        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingMemberRemoved)
                    .with_team(team_id)
                    .with_member(member.id)
                    .with_user(identity.user_id),
                [identity.user_id, owner_id],
            )
            .await;
        Ok(())
    })
    .await
}

/// Hands every team cipher back to the owner and deletes the share.
pub async fn stop_sharing(
    state: &AppState,
    identity: &Identity,
    cmd: StopSharingCommand,
) -> Result<StoppedShare, ServiceError> {
    let team_id = cmd.team_id;
    tracked(identity, "stop_sharing", Some(team_id), None, async {
        for (_, data) in &cmd.ciphers {
            require_payload(data, "invalid_data")?;
        }
        let mut tx = begin(state, "sharing_stop").await?;
        let result = async {
            let stopped = sharing::stop_sharing(
                &mut tx,
                team_id,
                identity.user_id,
                cmd.ciphers,
                cmd.folder_name,
                Utc::now(),
            )
            .await
            .map_err(|err| match err {
                SharingTxError::Rejected("owner_required") => {
                    forbidden("stop_sharing", &format!("teams/{team_id}"))
                }
                err => err.into(),
            })?;
            Ok::<_, ServiceError>(stopped)
        }
        .await;
        let stopped = db::settle(tx, result, "sharing_stop").await?;

        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingStopped).with_team(team_id),
                stopped
                    .member_user_ids
                    .iter()
                    .copied()
                    .chain([stopped.owner_id]),
            )
            .await;
        Ok(stopped)
    })
    .await
}

pub async fn set_cipher_collections(
    state: &AppState,
    identity: &Identity,
    cipher_id: Uuid,
    collection_ids: Vec<Uuid>,
) -> Result<Vec<Uuid>, ServiceError> {
    tracked(identity, "set_cipher_collections", None, Some(cipher_id), async {
        let cipher = CipherRepo::new(&state.db)
            .get_by_id(cipher_id)
            .await
            .map_err(|err| db_error("cipher_get_failed", &err))?
            .ok_or(ServiceError::NotFound)?;
        let Some(team_id) = cipher.team_id else {
            return Err(if cipher.is_owned_by(identity.user_id) {
                ServiceError::BadRequest("cipher_not_shared")
            } else {
                ServiceError::NotFound
            });
        };
        require_manager(state, identity, team_id, "set_collections").await?;

        let mut tx = begin(state, "sharing_set_collections").await?;
        let result = async {
            sharing::lock_acting_manager(&mut tx, team_id, identity.user_id).await?;
            let accepted = sharing::set_cipher_collections(
                &mut tx,
                cipher_id,
                team_id,
                &collection_ids,
                Utc::now(),
            )
            .await?;
            Ok::<_, ServiceError>(accepted)
        }
        .await;
        let accepted = db::settle(tx, result, "sharing_set_collections").await?;

        let audience = confirmed_audience(state, team_id).await?;
        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::CollectionUpdate)
                    .with_team(team_id)
                    .with_cipher(cipher_id),
                audience,
            )
            .await;
        Ok(accepted)
    })
    .await
}

/// Moves one of the caller's personal ciphers into a shared folder.
pub async fn add_cipher_to_share(
    state: &AppState,
    identity: &Identity,
    team_id: Uuid,
    collection_id: Uuid,
    cipher_id: Uuid,
    data: String,
) -> Result<(), ServiceError> {
    tracked(identity, "add_cipher_to_share", Some(team_id), Some(cipher_id), async {
        require_payload(&data, "invalid_data")?;
        require_manager(state, identity, team_id, "add_cipher").await?;
        let mut tx = begin(state, "sharing_add_cipher").await?;
        let result = async {
            sharing::add_cipher_to_share(
                &mut tx,
                team_id,
                collection_id,
                cipher_id,
                identity.user_id,
                &data,
                Utc::now(),
            )
            .await?;
            Ok::<_, ServiceError>(())
        }
        .await;
        db::settle(tx, result, "sharing_add_cipher").await?;

        let audience = confirmed_audience(state, team_id).await?;
        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::CipherUpdate)
                    .with_team(team_id)
                    .with_cipher(cipher_id),
                audience,
            )
            .await;
        Ok(())
    })
    .await
}

/// Shares the caller owns plus shares the caller has joined.
pub async fn list_shares(state: &AppState, identity: &Identity) -> Result<ShareList, ServiceError> {
    let teams = TeamRepo::new(&state.db)
        .list_for_user(
            identity.user_id,
            &[MemberStatus::Accepted, MemberStatus::Confirmed],
        )
        .await
        .map_err(|err| db_error("teams_list_failed", &err))?;
    let memberships = TeamMemberRepo::new(&state.db)
        .list_by_user(identity.user_id)
        .await
        .map_err(|err| db_error("team_members_list_failed", &err))?;

    let mut list = ShareList::default();
    for team in teams {
        let Some(membership) = memberships
            .iter()
            .find(|member| member.team_id == team.id)
            .cloned()
        else {
            continue;
        };
        if !membership.is_owner() {
            list.joined.push(JoinedShare { team, membership });
            continue;
        }
        let members = TeamMemberRepo::new(&state.db)
            .list_by_team(team.id)
            .await
            .map_err(|err| db_error("team_members_list_failed", &err))?;
        let groups = TeamGroupRepo::new(&state.db)
            .list_by_team(team.id)
            .await
            .map_err(|err| db_error("team_groups_list_failed", &err))?;
        let cipher_ids = CipherRepo::new(&state.db)
            .list_by_team(team.id)
            .await
            .map_err(|err| db_error("ciphers_list_failed", &err))?
            .into_iter()
            .map(|cipher| cipher.id)
            .collect();
        let collection = CollectionRepo::new(&state.db)
            .list_by_team(team.id)
            .await
            .map_err(|err| db_error("collections_list_failed", &err))?
            .into_iter()
            .next();
        list.owned.push(OwnedShare {
            team,
            members,
            groups,
            cipher_ids,
            collection,
        });
    }
    Ok(list)
}

async fn create_share(
    state: &AppState,
    identity: &Identity,
    share: NewShare,
) -> Result<ShareResult, ServiceError> {
    let mut tx = begin(state, "sharing_create").await?;
    let result = async {
        let created = sharing::create_share(&mut tx, share).await?;
        Ok::<_, ServiceError>(created)
    }
    .await;
    let created = db::settle(tx, result, "sharing_create").await?;

    tracing::info!(
        event = "share_created",
        team_id = %created.team.id,
        ciphers = created.cipher_ids.len(),
        invited = created.invited.len(),
        "Share created"
    );
    let mut moved = SyncEvent::new(SyncEventType::SyncVault).with_team(created.team.id);
    if let [cipher_id] = created.cipher_ids.as_slice() {
        moved = moved.with_cipher(*cipher_id);
    }
    state.notifier.notify(moved, [identity.user_id]).await;
    notify_invitees(state, created.team.id, &created.invited).await;

    Ok(ShareResult {
        team_id: created.team.id,
        created: true,
        invited: created.invited,
    })
}

async fn invite_into(
    state: &AppState,
    identity: &Identity,
    team_id: Uuid,
    plan: InvitationPlan,
    groups: Vec<GroupInvite>,
) -> Result<ShareResult, ServiceError> {
    let mut tx = begin(state, "sharing_add_members").await?;
    let result = async {
        let (team, owner_id, _) =
            sharing::lock_acting_manager(&mut tx, team_id, identity.user_id).await?;
        sharing::ensure_open_personal_share(&team)?;
        let policy = InvitePolicy {
            inviter_id: identity.user_id,
            group_admin: is_group_admin(state, identity),
            allow_email_invites: state.config.sharing.allow_email_invites,
        };
        let invited = sharing::invite_members(
            &mut tx,
            &team,
            owner_id,
            policy,
            plan.invites,
            groups,
            Utc::now(),
        )
        .await?;
        Ok::<_, ServiceError>((owner_id, invited))
    }
    .await;
    let (owner_id, invited) = db::settle(tx, result, "sharing_add_members").await?;

    notify_invitees(state, team_id, &invited).await;
    if owner_id != identity.user_id {
        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingMemberUpdated).with_team(team_id),
                [owner_id],
            )
            .await;
    }
    Ok(ShareResult {
        team_id,
        created: false,
        invited,
    })
}

async fn notify_invitees(state: &AppState, team_id: Uuid, invited: &[InvitedMember]) {
    for entry in invited {
        if entry.outcome != InviteOutcome::Created {
            continue;
        }
        let Some(user_id) = entry.member.user_id else {
            continue;
        };
        state
            .notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingInvitation)
                    .with_team(team_id)
                    .with_member(entry.member.id),
                [user_id],
            )
            .await;
    }
}

fn plan_for(
    state: &AppState,
    identity: &Identity,
    members: Vec<MemberInvite>,
    groups: &[GroupInvite],
) -> Result<InvitationPlan, ServiceError> {
    let plan = plan_invitations(
        &identity.email,
        members,
        state.config.sharing.max_invitations_per_request,
    )?;
    ensure_invitees(&plan, groups)?;
    if plan.duplicates > 0 || plan.skipped_self {
        tracing::debug!(
            event = "invitations_normalized",
            duplicates = plan.duplicates,
            skipped_self = plan.skipped_self,
        );
    }
    Ok(plan)
}

/// Fails unless the caller may manage members of the team. Transactions
/// re-check the role on the locked rows.
async fn require_manager(
    state: &AppState,
    identity: &Identity,
    team_id: Uuid,
    action: &'static str,
) -> Result<(), ServiceError> {
    let member = TeamMemberRepo::new(&state.db)
        .get_for_user(team_id, identity.user_id)
        .await
        .map_err(|err| db_error("team_member_get_failed", &err))?
        .ok_or(ServiceError::NotFound)?;
    if member.status != MemberStatus::Confirmed || !member.role.can_manage_members() {
        return Err(forbidden(action, &format!("teams/{team_id}")));
    }
    Ok(())
}

async fn confirmed_audience(state: &AppState, team_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
    TeamMemberRepo::new(&state.db)
        .confirmed_user_ids(team_id)
        .await
        .map_err(|err| db_error("team_members_list_failed", &err))
}

async fn begin(
    state: &AppState,
    event: &'static str,
) -> Result<sqlx_core::transaction::Transaction<'static, sqlx_postgres::Postgres>, ServiceError> {
    db::begin_tx(state, event)
        .await
        .map_err(|_| ServiceError::DbError)
}

fn require_payload(value: &str, code: &'static str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::BadRequest(code));
    }
    Ok(())
}

/// Records timing and an audit line for one sharing operation.
async fn tracked<T, F>(
    identity: &Identity,
    operation: &'static str,
    team_id: Option<Uuid>,
    target_id: Option<Uuid>,
    operation_future: F,
) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    let started = Instant::now();
    let result = operation_future.await;
    let outcome = outcome_label(&result);
    metrics::sharing_operation(operation, outcome, started.elapsed().as_secs_f64());
    let detail = result.as_ref().err().map(ToString::to_string);
    audit::sharing_event(
        identity,
        operation,
        outcome,
        team_id,
        target_id,
        detail.as_deref(),
    );
    result
}

fn outcome_label<T>(result: &Result<T, ServiceError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(ServiceError::DbError | ServiceError::Internal(_)) => "error",
        Err(_) => "denied",
    }
}
