//! REST client for Google Cloud Pub/Sub.
//!
//! ## API Endpoints
//!
//! - `POST /v1/projects/{project}/subscriptions/{subscription}:pull` - Pull messages
//! - `POST /v1/projects/{project}/subscriptions/{subscription}:acknowledge` - Acknowledge messages
//!
//! Works against the managed service and against emulators that speak the
//! same JSON API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::RelayConfig;
use crate::http::{authorize, build_client, error_from_response};
use crate::pubsub::MessageSource;
use crate::types::{MessageId, QueueItem, SubscriptionRef};
use crate::{Error, Result};

/// Request for pulling messages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Maximum number of messages to return.
    pub max_messages: i32,
    /// Whether to return immediately if no messages are available.
    pub return_immediately: bool,
}

/// Response for pulling messages.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Received messages. Omitted by the service when nothing is pending.
    #[serde(default)]
    pub received_messages: Vec<ReceivedMessage>,
}

/// A received message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    /// Acknowledgment ID.
    pub ack_id: String,
    /// The message.
    pub message: PubsubMessage,
    /// Delivery attempt counter.
    #[serde(default)]
    pub delivery_attempt: Option<i32>,
}

/// A Pub/Sub message as delivered by `pull`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubsubMessage {
    /// Message data (base64-encoded on the wire).
    #[serde(deserialize_with = "base64::deserialize", default)]
    pub data: Vec<u8>,
    /// Message attributes.
    #[serde(default)]
    pub attributes: Option<HashMap<String, String>>,
    /// Message ID (set by server).
    #[serde(default)]
    pub message_id: Option<String>,
    /// Publish timestamp (set by server).
    #[serde(default)]
    pub publish_time: Option<String>,
}

// Base64 decoding helper
mod base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}

/// Request for acknowledging messages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    /// Acknowledgment IDs.
    pub ack_ids: Vec<String>,
}

impl From<ReceivedMessage> for QueueItem {
    fn from(received: ReceivedMessage) -> Self {
        let message = received.message;
        QueueItem {
            ack_id: received.ack_id,
            message_id: message
                .message_id
                .map(MessageId::from_string)
                .unwrap_or_default(),
            data: message.data,
            attributes: message.attributes.unwrap_or_default(),
            publish_time: message
                .publish_time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc)),
            delivery_attempt: received
                .delivery_attempt
                .and_then(|n| u32::try_from(n).ok()),
        }
    }
}

/// Pub/Sub REST client bound to one subscription.
pub struct PubsubRestClient {
    client: Client,
    endpoint: String,
    subscription: SubscriptionRef,
    access_token: Option<String>,
    return_immediately: bool,
}

impl PubsubRestClient {
    /// Create a client for `subscription` at `endpoint`.
    pub fn new(endpoint: impl Into<String>, subscription: SubscriptionRef) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            subscription,
            access_token: None,
            return_immediately: true,
        })
    }

    /// Create a client from configuration.
    ///
    /// `emulator_host` is the value of `PUBSUB_EMULATOR_HOST`, if set.
    pub fn from_config(config: &RelayConfig, emulator_host: Option<&str>) -> Result<Self> {
        let endpoint = config.pubsub.resolve_endpoint(emulator_host);
        Ok(Self::new(endpoint, config.pubsub.subscription_ref())?
            .with_access_token(config.auth.access_token.clone())
            .with_return_immediately(config.pubsub.return_immediately))
    }

    /// Set the bearer token.
    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }

    /// Set whether pulls return at once when nothing is pending.
    pub fn with_return_immediately(mut self, return_immediately: bool) -> Self {
        self.return_immediately = return_immediately;
        self
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/v1/{}:{}", self.endpoint, self.subscription.path(), method)
    }

    fn not_found(&self) -> Error {
        Error::SubscriptionNotFound(self.subscription.path())
    }
}

#[async_trait]
impl MessageSource for PubsubRestClient {
    fn subscription(&self) -> &SubscriptionRef {
        &self.subscription
    }

    async fn pull(&self, max_messages: u32) -> Result<Vec<QueueItem>> {
        let url = self.method_url("pull");
        let request = PullRequest {
            max_messages: i32::try_from(max_messages).unwrap_or(i32::MAX),
            return_immediately: self.return_immediately,
        };

        debug!(url = %url, max_messages, "Pulling from subscription");

        let response = authorize(self.client.post(&url), self.access_token.as_deref())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, || self.not_found()).await);
        }

        let pulled: PullResponse = response.json().await?;
        debug!(count = pulled.received_messages.len(), "Pull completed");

        Ok(pulled
            .received_messages
            .into_iter()
            .map(QueueItem::from)
            .collect())
    }

    async fn acknowledge(&self, ack_ids: &[String]) -> Result<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }

        let url = self.method_url("acknowledge");
        let request = AcknowledgeRequest {
            ack_ids: ack_ids.to_vec(),
        };

        debug!(url = %url, count = ack_ids.len(), "Acknowledging messages");

        let response = authorize(self.client.post(&url), self.access_token.as_deref())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, || self.not_found()).await);
        }

        Ok(())
    }
}
