use std::collections::HashMap;

use chrono::{DateTime, Utc};
use locker_core::{
    Cipher, Collection, Folder, Identity, MemberStatus, Team, TeamMember, User,
};
use locker_db::repo::{CipherRepo, CollectionRepo, FolderRepo, TeamMemberRepo, TeamRepo, UserRepo};
use uuid::Uuid;

use crate::app::AppState;
use crate::domains::errors::{db_error, ServiceError};

/// A cipher as seen by one user, with the permissions that user holds on it.
#[derive(Debug)]
pub struct SyncedCipher {
    pub cipher: Cipher,
    pub collection_ids: Vec<Uuid>,
    pub view_password: bool,
    pub edit: bool,
}

#[derive(Debug)]
pub struct SyncedMembership {
    pub membership: TeamMember,
    pub team: Team,
}

#[derive(Debug)]
pub struct SyncPayload {
    pub profile: User,
    pub ciphers: Vec<SyncedCipher>,
    pub folders: Vec<Folder>,
    pub collections: Vec<Collection>,
    pub memberships: Vec<SyncedMembership>,
}

/// Full vault snapshot for the caller.
pub async fn sync(state: &AppState, identity: &Identity) -> Result<SyncPayload, ServiceError> {
    let profile = UserRepo::new(&state.db)
        .get_by_id(identity.user_id)
        .await
        .map_err(|err| db_error("user_get_failed", &err))?
        .ok_or(ServiceError::NotFound)?;

    let ciphers = CipherRepo::new(&state.db);
    let personal = ciphers
        .list_personal(identity.user_id)
        .await
        .map_err(|err| db_error("ciphers_list_failed", &err))?;
    let shared = ciphers
        .list_shared_with(identity.user_id)
        .await
        .map_err(|err| db_error("shared_ciphers_list_failed", &err))?;
    let memberships = TeamMemberRepo::new(&state.db)
        .list_by_user(identity.user_id)
        .await
        .map_err(|err| db_error("team_members_list_failed", &err))?;
    let teams = TeamRepo::new(&state.db)
        .list_for_user(
            identity.user_id,
            &[
                MemberStatus::Invited,
                MemberStatus::Accepted,
                MemberStatus::Confirmed,
            ],
        )
        .await
        .map_err(|err| db_error("teams_list_failed", &err))?;

    let confirmed_teams: Vec<Uuid> = memberships
        .iter()
        .filter(|member| member.status == MemberStatus::Confirmed)
        .map(|member| member.team_id)
        .collect();
    let collections = CollectionRepo::new(&state.db)
        .list_by_teams(&confirmed_teams)
        .await
        .map_err(|err| db_error("collections_list_failed", &err))?;
    let shared_ids: Vec<Uuid> = shared.iter().map(|cipher| cipher.id).collect();
    let links = ciphers
        .list_collection_links(&shared_ids)
        .await
        .map_err(|err| db_error("collection_links_list_failed", &err))?;
    let folders = FolderRepo::new(&state.db)
        .list_by_user(identity.user_id)
        .await
        .map_err(|err| db_error("folders_list_failed", &err))?;

    let ciphers = annotate_ciphers(personal, shared, &memberships, &links);
    tracing::debug!(
        event = "sync_assembled",
        ciphers = ciphers.len(),
        folders = folders.len(),
        teams = teams.len(),
    );
    Ok(SyncPayload {
        profile,
        ciphers,
        folders,
        collections,
        memberships: pair_memberships(memberships, teams),
    })
}

pub async fn revision(state: &AppState, identity: &Identity) -> Result<DateTime<Utc>, ServiceError> {
    UserRepo::new(&state.db)
        .get_by_id(identity.user_id)
        .await
        .map_err(|err| db_error("user_get_failed", &err))?
        .map(|user| user.revision_date)
        .ok_or(ServiceError::NotFound)
}

/// Attaches collection ids and the caller's permissions to every cipher.
///
/// Shared ciphers whose membership is missing or not confirmed are
/// dropped.
pub(crate) fn annotate_ciphers(
    personal: Vec<Cipher>,
    shared: Vec<Cipher>,
    memberships: &[TeamMember],
    links: &[(Uuid, Uuid)],
) -> Vec<SyncedCipher> {
    let by_team: HashMap<Uuid, &TeamMember> = memberships
        .iter()
        .filter(|member| member.status == MemberStatus::Confirmed)
        .map(|member| (member.team_id, member))
        .collect();
    let mut collections: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (cipher_id, collection_id) in links {
        collections.entry(*cipher_id).or_default().push(*collection_id);
    }

    let mut result = Vec::with_capacity(personal.len() + shared.len());
    result.extend(personal.into_iter().map(|cipher| SyncedCipher {
        cipher,
        collection_ids: Vec::new(),
        view_password: true,
        edit: true,
    }));
    for cipher in shared {
        let Some(member) = cipher.team_id.and_then(|team_id| by_team.get(&team_id)) else {
            continue;
        };
        result.push(SyncedCipher {
            collection_ids: collections.remove(&cipher.id).unwrap_or_default(),
            view_password: !member.hide_passwords,
            edit: member.role.can_edit_ciphers(),
            cipher,
        });
    }
    result
}

fn pair_memberships(memberships: Vec<TeamMember>, teams: Vec<Team>) -> Vec<SyncedMembership> {
    let mut teams: HashMap<Uuid, Team> = teams.into_iter().map(|team| (team.id, team)).collect();
    memberships
        .into_iter()
        .filter_map(|membership| {
            let team = teams.remove(&membership.team_id)?;
            Some(SyncedMembership { membership, team })
        })
        .collect()
}
