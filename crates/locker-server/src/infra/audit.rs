use locker_core::Identity;
use uuid::Uuid;

pub fn sharing_event(
    identity: &Identity,
    action: &str,
    result: &str,
    team_id: Option<Uuid>,
    target_id: Option<Uuid>,
    detail: Option<&str>,
) {
    tracing::info!(
        event = "audit",
        category = "sharing",
        action = action,
        result = result,
        team_id = ?team_id,
        target_id = ?target_id,
        user_id = %identity.user_id,
        session_id = %identity.session_id,
        detail = ?detail,
    );
}

pub fn groups_event(identity: &Identity, action: &str, group_id: Uuid, user_id: Option<Uuid>) {
    tracing::info!(
        event = "audit",
        category = "groups",
        action = action,
        group_id = %group_id,
        member_user_id = ?user_id,
        user_id = %identity.user_id,
    );
}
