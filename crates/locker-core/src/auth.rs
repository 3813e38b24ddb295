use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated caller, attached to the request by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub session_id: Uuid,
}

impl Identity {
    #[must_use]
    pub fn is_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}
