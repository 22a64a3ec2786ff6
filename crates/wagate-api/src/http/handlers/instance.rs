//! Multi-session routes under `/api/instances`.
//!
//! Every operation here requires an explicit instance id.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use wagate_types::session::{SendReceipt, SessionSummary, StatusSnapshot};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

use super::session::{QrPayload, SendMessageRequest, SetWebhookRequest, WebhookEcho, validate_send};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub client_id: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceCreated {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(flatten)]
    pub status: StatusSnapshot,
}

/// POST /api/instances - create and connect a new instance.
pub async fn create_instance(
    State(state): State<AppState>,
    Json(request): Json<CreateInstanceRequest>,
) -> Result<ApiResponse<InstanceCreated>, AppError> {
    let client_id = request
        .client_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("clientId is required".to_string()))?;

    let status = state
        .gateway
        .create_instance(&client_id, request.phone_number.clone())
        .await?;

    Ok(ApiResponse::success(InstanceCreated {
        client_id,
        phone_number: request.phone_number,
        status,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceList {
    pub instances: Vec<SessionSummary>,
    pub total: usize,
}

/// GET /api/instances - fresh snapshot of all instance summaries.
pub async fn list_instances(State(state): State<AppState>) -> ApiResponse<InstanceList> {
    let instances = state.gateway.list_instances();
    let total = instances.len();
    ApiResponse::success(InstanceList { instances, total })
}

/// POST /api/instances/{id}/connect
pub async fn connect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse<StatusSnapshot> {
    ApiResponse::success(state.gateway.connect(Some(&id)).await)
}

/// POST /api/instances/{id}/disconnect - always succeeds.
pub async fn disconnect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse<StatusSnapshot> {
    ApiResponse::success(state.gateway.disconnect(Some(&id)).await)
}

/// POST /api/instances/{id}/clear-session - always succeeds.
pub async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse<StatusSnapshot> {
    ApiResponse::success(state.gateway.clear_session(Some(&id)).await)
}

/// POST /api/instances/{id}/restart
pub async fn restart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse<StatusSnapshot> {
    ApiResponse::success(state.gateway.restart(Some(&id)).await)
}

/// GET /api/instances/{id}/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<StatusSnapshot>, AppError> {
    Ok(ApiResponse::success(state.gateway.get_status(Some(&id))?))
}

/// GET /api/instances/{id}/qr
pub async fn get_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<QrPayload>, AppError> {
    let payload = match state.gateway.get_qr(Some(&id))? {
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

/// POST /api/instances/{id}/send-message
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<ApiResponse<SendReceipt>, AppError> {
    let (phone, message) = validate_send(&request)?;
    let receipt = state.gateway.send_message(Some(&id), &phone, &message).await?;
    Ok(ApiResponse::success(receipt))
}

/// POST /api/instances/{id}/webhook - per-instance webhook override.
pub async fn set_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetWebhookRequest>,
) -> Result<ApiResponse<WebhookEcho>, AppError> {
    let url = request
        .webhook_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("webhookUrl is required".to_string()))?;
    state.gateway.set_instance_webhook(&id, &url)?;
    Ok(ApiResponse::success(WebhookEcho { webhook_url: url }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRemoved {
    pub client_id: String,
}

/// DELETE /api/instances/{id} - tear down and remove the instance.
pub async fn remove_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<InstanceRemoved>, AppError> {
    state.gateway.remove_instance(&id).await?;
    Ok(ApiResponse::success(InstanceRemoved { client_id: id }))
}
