// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the admin API.
//!
//! Handles POST /v1/sms/send, GET /v1/sms/status, GET /v1/sms/logs,
//! GET /v1/sms/stats, and the opt-out administration routes.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use fieldline_core::types::{DeliveryRecord, DeliveryStats, NotificationKind, OptOutEntry};
use fieldline_notify::SendError;

use crate::server::AppState;

/// Default and maximum page sizes for GET /v1/sms/logs.
const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 500;

/// Request body for POST /v1/sms/send.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// Destination phone in any accepted format.
    pub phone: String,
    /// Notification kind, snake_case.
    pub kind: NotificationKind,
    /// Template variables.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Response body for POST /v1/sms/send.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    /// Provider message id (synthetic in test mode).
    pub message_id: String,
}

/// Response body for GET /v1/sms/status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether provider credentials (or test mode) are present.
    pub configured: bool,
    /// Whether the service will accept sends.
    pub enabled: bool,
    /// Whether sandbox mode is active.
    pub test_mode: bool,
    /// Provider identifier.
    pub service: String,
}

/// Response body for GET /v1/sms/logs.
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub deliveries: Vec<DeliveryRecord>,
}

/// Response body for GET /v1/sms/opt-outs.
#[derive(Debug, Serialize)]
pub struct OptOutsResponse {
    pub opt_outs: Vec<OptOutEntry>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Inclusive RFC 3339 lower bound.
    pub from: Option<String>,
    /// Exclusive RFC 3339 upper bound.
    pub to: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn map_send_error(err: SendError) -> Response {
    let status = match err {
        SendError::InvalidPhone | SendError::OptedOut => StatusCode::BAD_REQUEST,
        SendError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        SendError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        SendError::Transport => StatusCode::BAD_GATEWAY,
        SendError::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn map_store_error(err: fieldline_core::FieldlineError) -> Response {
    tracing::error!(error = %err, "store operation failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable")
}

/// POST /v1/sms/send
pub async fn post_send(State(state): State<AppState>, Json(body): Json<SendRequest>) -> Response {
    match state
        .service
        .send(&body.phone, body.kind, &body.variables)
        .await
    {
        Ok(receipt) => (
            StatusCode::OK,
            Json(SendResponse {
                success: true,
                message_id: receipt.message_id,
            }),
        )
            .into_response(),
        Err(e) => map_send_error(e),
    }
}

/// GET /v1/sms/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let configured = state.service.is_configured();
    Json(StatusResponse {
        configured,
        enabled: configured,
        test_mode: state.service.test_mode(),
        service: state.service.provider_name().to_string(),
    })
}

/// GET /v1/sms/logs?limit=
pub async fn get_logs(State(state): State<AppState>, Query(query): Query<LogsQuery>) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);
    match state.service.recent_deliveries(limit).await {
        Ok(deliveries) => Json(LogsResponse { deliveries }).into_response(),
        Err(e) => map_store_error(e),
    }
}

/// GET /v1/sms/stats?from=&to=
pub async fn get_stats(State(state): State<AppState>, Query(query): Query<StatsQuery>) -> Response {
    match state
        .service
        .stats(query.from.as_deref(), query.to.as_deref())
        .await
    {
        Ok(stats) => Json::<DeliveryStats>(stats).into_response(),
        Err(e) => map_store_error(e),
    }
}

/// GET /v1/sms/opt-outs
pub async fn get_opt_outs(State(state): State<AppState>) -> Response {
    match state.service.list_opt_outs().await {
        Ok(opt_outs) => Json(OptOutsResponse { opt_outs }).into_response(),
        Err(e) => map_store_error(e),
    }
}

/// DELETE /v1/sms/opt-outs/{phone}
pub async fn delete_opt_out(State(state): State<AppState>, Path(phone): Path<String>) -> Response {
    if !fieldline_core::phone::validate(&phone) {
        return error_response(StatusCode::BAD_REQUEST, "invalid phone number format");
    }
    match state.service.remove_opt_out(&phone).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "phone number is not opted out"),
        Err(e) => map_store_error(e),
    }
}

/// GET /health (public)
pub async fn get_public_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_deserializes_with_defaults() {
        let json = r#"{"phone": "8025550123", "kind": "appointment_reminder"}"#;
        let req: SendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.phone, "8025550123");
        assert_eq!(req.kind, NotificationKind::AppointmentReminder);
        assert!(req.variables.is_empty());
    }

    #[test]
    fn send_request_deserializes_with_variables() {
        let json = r#"{
            "phone": "8025550123",
            "kind": "status_update",
            "variables": {"customerName": "Jo", "message": "on the way"}
        }"#;
        let req: SendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.variables.get("customerName").unwrap(), "Jo");
    }

    #[test]
    fn send_request_rejects_unknown_kind() {
        let json = r#"{"phone": "8025550123", "kind": "marketing_blast"}"#;
        assert!(serde_json::from_str::<SendRequest>(json).is_err());
    }

    #[test]
    fn status_response_serializes() {
        let resp = StatusResponse {
            configured: true,
            enabled: true,
            test_mode: false,
            service: "twilio".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"configured\":true"));
        assert!(json.contains("\"test_mode\":false"));
        assert!(json.contains("\"service\":\"twilio\""));
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "rate limit exceeded".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("rate limit exceeded"));
    }
}
