//! Delivery-report webhook for the SMS gateway
//!
//! The gateway calls back with the delivery outcome of sent messages. The
//! request body is authenticated with an HMAC-SHA256 signature before
//! anything is parsed.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::AppState;

/// Response for webhook processing
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
}

/// Delivery report sent by the gateway
#[derive(Debug, Deserialize)]
pub struct DeliveryReport {
    pub message_id: String,
    pub recipient: String,
    pub status: String,
}

/// Handle SMS gateway delivery reports
/// POST /webhook/notify
pub async fn handle_notify_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<WebhookResponse>)> {
    // Verify gateway signature
    let secret = &state.config.notifier.webhook_secret;
    if let Err(e) = verify_notifier_signature(&headers, &body, secret) {
        tracing::warn!("Notifier webhook signature verification failed: {}", e);
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(WebhookResponse {
                success: false,
                message: "Invalid signature".to_string(),
            }),
        ));
    }

    // Parse delivery report
    let report: DeliveryReport = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to parse delivery report: {}", e);
            return Err((
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse {
                    success: false,
                    message: format!("Invalid request body: {}", e),
                }),
            ));
        }
    };

    // Record the outcome; a storage failure still returns 200 so the
    // gateway does not retry indefinitely
    let result = sqlx::query(
        r#"
        INSERT INTO notification_log (message_id, recipient, status)
        VALUES ($1, $2, $3)
        ON CONFLICT (message_id) DO UPDATE SET status = EXCLUDED.status, updated_at = NOW()
        "#,
    )
    .bind(&report.message_id)
    .bind(&report.recipient)
    .bind(&report.status)
    .execute(&state.db)
    .await;

    if let Err(e) = result {
        tracing::error!("Failed to record delivery report: {}", e);
        return Ok(Json(WebhookResponse {
            success: false,
            message: format!("Processing error: {}", e),
        }));
    }

    Ok(Json(WebhookResponse {
        success: true,
        message: "Delivery report recorded".to_string(),
    }))
}

/// Verify the gateway's HMAC-SHA256 signature over the raw body
fn verify_notifier_signature(
    headers: &HeaderMap,
    body: &[u8],
    secret: &str,
) -> Result<(), String> {
    let signature = headers
        .get("x-notifier-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| "Missing X-Notifier-Signature header".to_string())?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| format!("Invalid webhook secret: {}", e))?;
    mac.update(body);
    let expected = BASE64.encode(mac.finalize().into_bytes());

    if expected == signature {
        Ok(())
    } else {
        Err("Signature mismatch".to_string())
    }
}
