//! Push transport abstraction.
//!
//! The dispatcher persists the in-app record first and treats every push
//! attempt as best-effort per device; the transport is injected so it can be
//! swapped for a provider client or disabled entirely.

use async_trait::async_trait;
use koinonia_common::{AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Payload handed to the push transport for a single device.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Notification category string.
    pub category: String,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Additional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Trait for delivering a push message to a single device token.
///
/// Calls are independent per token with no ordering guarantee. A failure
/// reported here is logged and skipped by the dispatcher, never propagated.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Deliver `message` to `device_token`.
    async fn send(&self, device_token: &str, message: &PushMessage) -> AppResult<()>;
}

/// HTTP push transport posting to a provider endpoint.
pub struct HttpPushTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushTransport {
    /// Create a transport with a bounded per-request timeout so a slow
    /// provider cannot starve the fan-out loop.
    pub fn new(endpoint: String, timeout_secs: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build push client: {e}")))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn send(&self, device_token: &str, message: &PushMessage) -> AppResult<()> {
        let body = serde_json::json!({
            "to": device_token,
            "category": message.category,
            "title": message.title,
            "body": message.body,
            "data": message.data,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Push request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Push provider returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// A no-op transport for testing or when push delivery is disabled.
#[derive(Clone, Default)]
pub struct NoOpPushTransport;

#[async_trait]
impl PushTransport for NoOpPushTransport {
    async fn send(&self, _device_token: &str, _message: &PushMessage) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `PushTransport` trait object.
pub type PushTransportService = Arc<dyn PushTransport>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn push_message_serializes_camel_case() {
        let message = PushMessage {
            category: "community".to_string(),
            title: "Hello".to_string(),
            body: "World".to_string(),
            data: Some(serde_json::json!({"eventId": "e1"})),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["category"], "community");
        assert_eq!(value["data"]["eventId"], "e1");
    }

    #[test]
    fn push_message_skips_absent_data() {
        let message = PushMessage {
            category: "feed".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            data: None,
        };

        let value = serde_json::to_value(&message).unwrap();
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn noop_transport_always_succeeds() {
        let transport = NoOpPushTransport;
        let message = PushMessage {
            category: "community".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            data: None,
        };

        assert!(transport.send("token", &message).await.is_ok());
    }
}
