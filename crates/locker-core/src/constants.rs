pub const DEFAULT_SHARE_TEAM_NAME: &str = "Personal share";
pub const DEFAULT_MAX_INVITATIONS_PER_REQUEST: usize = 100;
pub const FCM_MAX_REGISTRATION_IDS: usize = 500;
pub const SESSION_TOKEN_BYTES: usize = 32;
