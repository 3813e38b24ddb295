use serde::{Deserialize, Serialize};

use locker_core::DEFAULT_MAX_INVITATIONS_PER_REQUEST;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerRuntimeConfig,
    #[serde(default)]
    pub sharing: SharingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub sentry: SentryConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRuntimeConfig {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            name: None,
            trusted_proxies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingConfig {
    #[serde(default = "default_max_invitations_per_request")]
    pub max_invitations_per_request: usize,
    /// Invite addresses that have no account yet; the invitation is claimed
    /// when the account is created.
    #[serde(default = "default_true")]
    pub allow_email_invites: bool,
    /// Emails allowed to create groups and manage their members.
    #[serde(default)]
    pub group_admins: Vec<String>,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            max_invitations_per_request: default_max_invitations_per_request(),
            allow_email_invites: default_true(),
            group_admins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    #[serde(default)]
    pub push: PushConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            push: PushConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_fcm_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub server_key: Option<String>,
    #[serde(default)]
    pub server_key_file: Option<String>,
    #[serde(default = "default_push_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_fcm_endpoint(),
            server_key: None,
            server_key_file: None,
            timeout_seconds: default_push_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SentryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub dsn: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub profile: Option<MetricsProfile>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_metrics_endpoint(),
            profile: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricsProfile {
    #[default]
    Prod,
    Staging,
    Debug,
}

impl MetricsConfig {
    #[must_use]
    pub fn effective_profile(&self) -> MetricsProfile {
        self.profile.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub sampling_ratio: Option<f64>,
}

const fn default_true() -> bool {
    true
}

const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

const fn default_max_invitations_per_request() -> usize {
    DEFAULT_MAX_INVITATIONS_PER_REQUEST
}

const fn default_event_channel_capacity() -> usize {
    1024
}

fn default_fcm_endpoint() -> String {
    DEFAULT_FCM_ENDPOINT.to_string()
}

const fn default_push_timeout_seconds() -> u64 {
    10
}

fn default_metrics_endpoint() -> String {
    "/metrics".to_string()
}
