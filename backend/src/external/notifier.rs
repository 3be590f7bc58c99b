//! SMS gateway client
//!
//! Best-effort delivery: a failed notification is logged and reported as
//! `false`, it never fails the caller's critical path.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::NotifierConfig;

/// Client for the SMS gateway
#[derive(Clone)]
pub struct NotifierClient {
    gateway_url: String,
    api_key: String,
    sender_id: String,
    http_client: Client,
}

/// Outbound message request
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    to: &'a str,
    from: &'a str,
    text: &'a str,
}

/// Gateway response
#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl NotifierClient {
    /// Create a new notifier client
    pub fn new(config: &NotifierConfig) -> Self {
        Self {
            gateway_url: config.gateway_url.clone(),
            api_key: config.api_key.clone(),
            sender_id: config.sender_id.clone(),
            http_client: Client::new(),
        }
    }

    /// Send a message to a recipient. Returns whether the gateway accepted
    /// it; all failures are logged, none propagate.
    pub async fn notify(&self, recipient: &str, message: &str) -> bool {
        let request = SendMessageRequest {
            to: recipient,
            from: &self.sender_id,
            text: message,
        };

        let response = self
            .http_client
            .post(format!("{}/messages", self.gateway_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<SendMessageResponse>().await {
                    Ok(body) => {
                        if let Some(error) = body.error {
                            tracing::warn!("SMS gateway rejected message: {}", error);
                            false
                        } else {
                            tracing::debug!(
                                "SMS accepted for {} (message_id: {:?})",
                                recipient,
                                body.message_id
                            );
                            true
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Unreadable SMS gateway response: {}", e);
                        false
                    }
                }
            }
            Ok(resp) => {
                tracing::warn!("SMS gateway returned status {}", resp.status());
                false
            }
            Err(e) => {
                tracing::warn!("SMS gateway unreachable: {}", e);
                false
            }
        }
    }
}
