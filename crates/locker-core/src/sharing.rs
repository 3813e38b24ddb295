//! Rules shared by the sharing service and the sharing transactions.
//!
//! Nothing here touches storage. Callers load the rows, ask these helpers
//! whether a change is allowed, then persist.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MemberStatus, TeamMember, TeamMemberRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharingViolation {
    InvalidEmail,
    OwnerRoleNotAssignable,
    TooManyInvitations,
    MembersRequired,
    OwnerMissing,
    MultipleOwners,
    CollectionNotInTeam,
    InvalidTransition,
    CannotModifyOwner,
    CannotRemoveOwner,
    InsufficientRole,
}

impl SharingViolation {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidEmail => "invalid_email",
            Self::OwnerRoleNotAssignable => "owner_role_not_assignable",
            Self::TooManyInvitations => "too_many_invitations",
            Self::MembersRequired => "members_required",
            Self::OwnerMissing => "owner_missing",
            Self::MultipleOwners => "multiple_owners",
            Self::CollectionNotInTeam => "collection_not_in_team",
            Self::InvalidTransition => "invalid_member_status",
            Self::CannotModifyOwner => "cannot_modify_owner",
            Self::CannotRemoveOwner => "cannot_remove_owner",
            Self::InsufficientRole => "insufficient_role",
        }
    }
}

impl std::fmt::Display for SharingViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::error::Error for SharingViolation {}

/// One requested invitation, as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MemberInvite {
    pub email: String,
    #[serde(default = "default_invite_role")]
    pub role: TeamMemberRole,
    #[serde(default)]
    pub hide_passwords: bool,
    /// Team key already wrapped for the invitee, when the client knew the
    /// invitee's public key.
    #[serde(default)]
    pub key: Option<String>,
}

const fn default_invite_role() -> TeamMemberRole {
    TeamMemberRole::Member
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GroupInvite {
    pub group_id: Uuid,
    #[serde(default = "default_invite_role")]
    pub role: TeamMemberRole,
    #[serde(default)]
    pub hide_passwords: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationPlan {
    pub invites: Vec<MemberInvite>,
    pub skipped_self: bool,
    pub duplicates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InviteOutcome {
    Created,
    AlreadyMember,
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_ascii_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return None;
    }
    Some(email)
}

/// Normalises and deduplicates requested invitations.
///
/// The first occurrence of an email wins. The inviter's own address is
/// dropped rather than rejected, since clients commonly echo the full
/// member list back.
pub fn plan_invitations(
    inviter_email: &str,
    requested: Vec<MemberInvite>,
    max_invitations: usize,
) -> Result<InvitationPlan, SharingViolation> {
    let inviter = normalize_email(inviter_email);
    let mut seen = HashSet::new();
    let mut plan = InvitationPlan::default();
    for invite in requested {
        let email = normalize_email(&invite.email).ok_or(SharingViolation::InvalidEmail)?;
        if invite.role == TeamMemberRole::Owner {
            return Err(SharingViolation::OwnerRoleNotAssignable);
        }
        if inviter.as_deref() == Some(email.as_str()) {
            plan.skipped_self = true;
            continue;
        }
        if !seen.insert(email.clone()) {
            plan.duplicates += 1;
            continue;
        }
        plan.invites.push(MemberInvite { email, ..invite });
    }
    if plan.invites.len() > max_invitations {
        return Err(SharingViolation::TooManyInvitations);
    }
    Ok(plan)
}

pub fn ensure_invitees(
    plan: &InvitationPlan,
    groups: &[GroupInvite],
) -> Result<(), SharingViolation> {
    if plan.invites.is_empty() && groups.is_empty() {
        return Err(SharingViolation::MembersRequired);
    }
    if groups.iter().any(|group| group.role == TeamMemberRole::Owner) {
        return Err(SharingViolation::OwnerRoleNotAssignable);
    }
    Ok(())
}

/// Returns the single owner of a team.
pub fn single_owner(members: &[TeamMember]) -> Result<&TeamMember, SharingViolation> {
    let mut owners = members.iter().filter(|member| member.is_owner());
    let owner = owners.next().ok_or(SharingViolation::OwnerMissing)?;
    if owners.next().is_some() {
        return Err(SharingViolation::MultipleOwners);
    }
    if owner.user_id.is_none() || owner.status != MemberStatus::Confirmed {
        return Err(SharingViolation::OwnerMissing);
    }
    Ok(owner)
}

/// Deduplicates the requested collection ids and checks that every one of
/// them belongs to the team.
pub fn validate_collection_subset(
    requested: &[Uuid],
    team_collections: &[Uuid],
) -> Result<Vec<Uuid>, SharingViolation> {
    let allowed: HashSet<&Uuid> = team_collections.iter().collect();
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(requested.len());
    for id in requested {
        if !allowed.contains(id) {
            return Err(SharingViolation::CollectionNotInTeam);
        }
        if seen.insert(*id) {
            result.push(*id);
        }
    }
    Ok(result)
}

/// True when `provided` names exactly the ids in `expected`, each once.
#[must_use]
pub fn covers_exactly(expected: &[Uuid], provided: &[Uuid]) -> bool {
    let expected: HashSet<&Uuid> = expected.iter().collect();
    let mut seen = HashSet::new();
    for id in provided {
        if !expected.contains(id) || !seen.insert(id) {
            return false;
        }
    }
    seen.len() == expected.len()
}

pub fn check_transition(from: MemberStatus, to: MemberStatus) -> Result<(), SharingViolation> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(SharingViolation::InvalidTransition)
    }
}

/// Whether `actor` may change `target`'s role or flags.
pub fn check_member_update(
    actor: &TeamMember,
    target: &TeamMember,
    new_role: Option<TeamMemberRole>,
) -> Result<(), SharingViolation> {
    if !actor.role.can_manage_members() {
        return Err(SharingViolation::InsufficientRole);
    }
    if target.is_owner() {
        return Err(SharingViolation::CannotModifyOwner);
    }
    if new_role == Some(TeamMemberRole::Owner) {
        return Err(SharingViolation::OwnerRoleNotAssignable);
    }
    if !actor.is_owner() {
        if target.role.rank() >= actor.role.rank() {
            return Err(SharingViolation::InsufficientRole);
        }
        if new_role.is_some_and(|role| role.rank() >= actor.role.rank()) {
            return Err(SharingViolation::InsufficientRole);
        }
    }
    Ok(())
}

pub fn check_member_removal(
    actor: &TeamMember,
    target: &TeamMember,
) -> Result<(), SharingViolation> {
    if target.is_owner() {
        return Err(SharingViolation::CannotRemoveOwner);
    }
    if !actor.role.can_manage_members() {
        return Err(SharingViolation::InsufficientRole);
    }
    if !actor.is_owner() && target.role.rank() >= actor.role.rank() {
        return Err(SharingViolation::InsufficientRole);
    }
    Ok(())
}
