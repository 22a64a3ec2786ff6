//! Single-session routes under `/api/whatsapp`.
//!
//! These address the fixed default instance id implicitly.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use wagate_core::session::ConnectionProfile;
use wagate_types::error::SessionError;
use wagate_types::message::CanonicalMessage;
use wagate_types::session::{SendReceipt, StatusSnapshot};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/whatsapp/connect - start the default session.
pub async fn connect(State(state): State<AppState>) -> ApiResponse<StatusSnapshot> {
    ApiResponse::success(state.gateway.connect(None).await)
}

/// POST /api/whatsapp/connect-retry - start under the resilient profile.
pub async fn connect_retry(State(state): State<AppState>) -> ApiResponse<StatusSnapshot> {
    ApiResponse::success(
        state
            .gateway
            .connect_with_profile(None, ConnectionProfile::resilient())
            .await,
    )
}

/// POST /api/whatsapp/disconnect - tear the session down. Always succeeds.
pub async fn disconnect(State(state): State<AppState>) -> ApiResponse<StatusSnapshot> {
    ApiResponse::success(state.gateway.disconnect(None).await)
}

/// POST /api/whatsapp/clear-session - nuclear reset. Always succeeds.
pub async fn clear_session(State(state): State<AppState>) -> ApiResponse<StatusSnapshot> {
    ApiResponse::success(state.gateway.clear_session(None).await)
}

/// POST /api/whatsapp/restart - clear, pause, reconnect.
pub async fn restart(State(state): State<AppState>) -> ApiResponse<StatusSnapshot> {
    ApiResponse::success(state.gateway.restart(None).await)
}

#[derive(Debug, Serialize)]
pub struct QrPayload {
    /// `data:` URL of the rendered QR image, when a challenge is held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr: Option<String>,
    pub available: bool,
}

/// GET /api/whatsapp/qr - current pairing challenge as an image payload.
pub async fn get_qr(State(state): State<AppState>) -> Result<ApiResponse<QrPayload>, AppError> {
    let payload = match state.gateway.get_qr(None)? {
        Some(challenge) => QrPayload {
            qr: Some(
                wagate_infra::qr::render_challenge_data_url(&challenge)
                    .map_err(|e| AppError::Internal(e.to_string()))?,
            ),
            available: true,
        },
        None => QrPayload {
            qr: None,
            available: false,
        },
    };
    Ok(ApiResponse::success(payload))
}

/// GET /api/whatsapp/status - connection-status snapshot.
pub async fn get_status(
    State(state): State<AppState>,
) -> Result<ApiResponse<StatusSnapshot>, AppError> {
    Ok(ApiResponse::success(state.gateway.get_status(None)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub phone_number: Option<String>,
    pub message: Option<String>,
}

pub(crate) fn validate_send(
    request: &SendMessageRequest,
) -> Result<(String, String), AppError> {
    match (&request.phone_number, &request.message) {
        (Some(phone), Some(message)) if !phone.is_empty() && !message.is_empty() => {
            Ok((phone.clone(), message.clone()))
        }
        _ => Err(AppError::Validation(
            "phoneNumber and message are required".to_string(),
        )),
    }
}

/// POST /api/whatsapp/send-message - send a text message.
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<ApiResponse<SendReceipt>, AppError> {
    let (phone, message) = validate_send(&request)?;
    let receipt = state
        .gateway
        .send_message(None, &phone, &message)
        .await
        .map_err(|err| match err {
            // The implicit instance not existing just means nothing is
            // connected yet.
            SessionError::NotFound => AppError::Session(SessionError::NotConnected),
            other => AppError::Session(other),
        })?;
    Ok(ApiResponse::success(receipt))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetWebhookRequest {
    pub webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEcho {
    pub webhook_url: String,
}

/// POST /api/whatsapp/webhook - set the default webhook URL.
pub async fn set_webhook(
    State(state): State<AppState>,
    Json(request): Json<SetWebhookRequest>,
) -> Result<ApiResponse<WebhookEcho>, AppError> {
    let url = request
        .webhook_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("webhookUrl is required".to_string()))?;
    state.gateway.set_webhook(&url);
    Ok(ApiResponse::success(WebhookEcho { webhook_url: url }))
}

/// POST /api/whatsapp/test-webhook - push a sample record through the
/// relay to verify the configured endpoint.
pub async fn test_webhook(State(state): State<AppState>) -> ApiResponse<CanonicalMessage> {
    ApiResponse::success(state.gateway.send_test_webhook().await)
}
