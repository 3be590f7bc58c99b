//! Receipt render service client
//!
//! Rendering is delegated to an external PDF service; this client fetches
//! the bytes and stores them under the configured receipts directory keyed
//! by transaction id.

use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;

use crate::config::ReceiptConfig;
use crate::error::{AppError, AppResult};

/// Client for the receipt render service
#[derive(Clone)]
pub struct ReceiptClient {
    render_endpoint: String,
    output_dir: PathBuf,
    http_client: Client,
}

/// Render request sent to the service
#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    template: &'a str,
    data: &'a serde_json::Value,
}

impl ReceiptClient {
    /// Create a new receipt client
    pub fn new(config: &ReceiptConfig) -> Self {
        Self {
            render_endpoint: config.render_endpoint.clone(),
            output_dir: PathBuf::from(&config.output_dir),
            http_client: Client::new(),
        }
    }

    /// Render a template with the given data, returning PDF bytes
    pub async fn render(&self, template: &str, data: &serde_json::Value) -> AppResult<Vec<u8>> {
        let response = self
            .http_client
            .post(&self.render_endpoint)
            .json(&RenderRequest { template, data })
            .send()
            .await
            .map_err(|e| AppError::Dependency(format!("Receipt render request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Dependency(format!(
                "Receipt render service returned status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Dependency(format!("Receipt render body unreadable: {}", e)))?;

        Ok(bytes.to_vec())
    }

    /// Store rendered receipt bytes, returning the stored path
    pub async fn store(&self, transaction_id: &str, bytes: &[u8]) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::Dependency(format!("Receipt directory unavailable: {}", e)))?;

        let path = self.output_dir.join(format!("{}.pdf", transaction_id));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Dependency(format!("Receipt write failed: {}", e)))?;

        Ok(path.to_string_lossy().into_owned())
    }
}
