use std::time::Duration;

use async_trait::async_trait;
use locker_core::SyncEvent;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};

use crate::config::PushConfig;
use crate::domains::sync::notifier::{PushError, PushGateway};

/// Legacy FCM HTTP gateway.
pub struct FcmGateway {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl FcmGateway {
    pub fn new(config: &PushConfig, server_key: String) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|err| PushError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            server_key,
        })
    }
}

pub(crate) fn build_body(registration_ids: &[String], event: &SyncEvent) -> Value {
    json!({
        "registration_ids": registration_ids,
        "priority": "high",
        "data": {
            "event": event.event_type.as_str(),
            "payload": event,
        },
    })
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(&self, registration_ids: &[String], event: &SyncEvent) -> Result<(), PushError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("key={}", self.server_key))
            .json(&build_body(registration_ids, event))
            .send()
            .await
            .map_err(|err| PushError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PushError::Status(status.as_u16()));
        }
        Ok(())
    }
}
