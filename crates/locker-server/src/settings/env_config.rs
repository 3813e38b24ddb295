use std::env;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::config::{MetricsProfile, ServerConfig};

pub(super) fn load_config(path: &str) -> ServerConfig {
    if !Path::new(path).exists() {
        return ServerConfig::default();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(event = "config_read_failed", path, error = %err);
            return ServerConfig::default();
        }
    };
    match serde_yaml::from_str(&contents) {
        Ok(config) => config,
        Err(err) => {
            warn!(event = "config_parse_failed", path, error = %err);
            ServerConfig::default()
        }
    }
}

pub(super) fn apply_server_env_overrides(config: &mut ServerConfig) {
    if let Ok(value) = env::var("LOCKER_MAX_BODY_BYTES") {
        match value.trim().parse::<usize>() {
            Ok(bytes) if bytes > 0 => config.server.max_body_bytes = bytes,
            _ => warn!(event = "config_invalid", field = "LOCKER_MAX_BODY_BYTES", value = %value),
        }
    }
}

pub(super) fn apply_sync_env_overrides(config: &mut ServerConfig) {
    if let Ok(value) = env::var("LOCKER_SYNC_PUSH_ENABLED") {
        if let Some(enabled) = parse_bool(&value) {
            config.sync.push.enabled = enabled;
        } else {
            warn!(
                event = "config_invalid",
                field = "LOCKER_SYNC_PUSH_ENABLED",
                value = %value
            );
        }
    }
}

pub(super) fn apply_tracing_env_overrides(config: &mut ServerConfig) {
    if let Ok(value) = env::var("LOCKER_TRACING_OTEL_ENABLED") {
        if let Some(enabled) = parse_bool(&value) {
            config.tracing.otel.enabled = enabled;
        } else {
            warn!(
                event = "config_invalid",
                field = "LOCKER_TRACING_OTEL_ENABLED",
                value = %value
            );
        }
    }
    if let Ok(value) = env::var("LOCKER_TRACING_OTEL_ENDPOINT") {
        let value = value.trim();
        if !value.is_empty() {
            config.tracing.otel.endpoint = Some(value.to_string());
        }
    }
}

pub(super) fn apply_metrics_env_overrides(config: &mut ServerConfig) {
    if let Ok(value) = env::var("LOCKER_METRICS_ENABLED") {
        if let Some(enabled) = parse_bool(&value) {
            config.metrics.enabled = enabled;
        } else {
            warn!(
                event = "config_invalid",
                field = "LOCKER_METRICS_ENABLED",
                value = %value
            );
        }
    }
    if let Ok(value) = env::var("LOCKER_METRICS_ENDPOINT") {
        let value = value.trim();
        if value.starts_with('/') {
            config.metrics.endpoint = value.to_string();
        } else {
            warn!(event = "config_invalid", field = "LOCKER_METRICS_ENDPOINT", value = %value);
        }
    }
    if let Ok(value) = env::var("LOCKER_METRICS_PROFILE") {
        if let Some(profile) = parse_metrics_profile(&value) {
            config.metrics.profile = Some(profile);
        } else {
            warn!(
                event = "config_invalid",
                field = "LOCKER_METRICS_PROFILE",
                value = %value
            );
        }
    }
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_metrics_profile(value: &str) -> Option<MetricsProfile> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "prod" | "production" => Some(MetricsProfile::Prod),
        "staging" => Some(MetricsProfile::Staging),
        "debug" => Some(MetricsProfile::Debug),
        _ => None,
    }
}

/// Env var, then env file, then the config file.
pub(super) fn load_fcm_server_key(config: &ServerConfig) -> Option<String> {
    match load_secret_env_or_file("LOCKER_FCM_SERVER_KEY", "LOCKER_FCM_SERVER_KEY_FILE") {
        Ok(Some(value)) => return Some(value),
        Ok(None) => {}
        Err(err) => {
            warn!(event = "config_invalid", field = "LOCKER_FCM_SERVER_KEY", error = %err);
            return None;
        }
    }
    if let Some(value) = config.sync.push.server_key.as_deref() {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    let path = config.sync.push.server_key_file.as_deref()?;
    match read_secret_file(path) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(event = "fcm_server_key_read_failed", path, error = %err);
            None
        }
    }
}

pub(super) fn load_secret_env_or_file(
    var_name: &str,
    file_var_name: &str,
) -> Result<Option<String>, String> {
    if let Ok(value) = env::var(var_name) {
        return Ok(Some(value));
    }
    let Ok(path) = env::var(file_var_name) else {
        return Ok(None);
    };
    read_secret_file(&path)
        .map(Some)
        .map_err(|err| format!("{file_var_name} invalid: {err}"))
}

fn read_secret_file(path: &str) -> Result<String, String> {
    let value = fs::read_to_string(path)
        .map_err(|err| format!("secret file not accessible ({}): {}", path, err))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("secret file is empty ({})", path));
    }
    Ok(trimmed.to_string())
}
