// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider webhook: delivery status reconciliation and inbound opt-outs.
//!
//! Twilio POSTs form-encoded status callbacks and inbound messages to the
//! same URL. The handler validates the `X-Twilio-Signature` header, applies
//! any status update to the delivery log, and records opt-outs for inbound
//! STOP-family keywords. It always answers 200 to a well-formed request:
//! an unknown message id is the provider's problem, not a server fault.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use fieldline_core::types::DeliveryStatus;
use fieldline_notify::consent::is_opt_out_keyword;
use fieldline_twilio::signature::validate_signature;

use crate::server::AppState;

/// Webhook verification settings.
#[derive(Clone)]
pub struct WebhookState {
    /// Provider auth token used to verify callback signatures. `None`
    /// disables verification (sandbox deployments).
    pub auth_token: Option<String>,
    /// Externally visible URL of this webhook endpoint. The signature is
    /// computed over this exact URL, so it must match what the provider
    /// was given as the status callback.
    pub callback_url: Option<String>,
}

impl std::fmt::Debug for WebhookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookState")
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[redacted]"))
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

/// POST /v1/sms/webhook
pub async fn post_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    // Only an authentication failure is surfaced to the provider; anything
    // else is acknowledged so the provider does not retry indefinitely.
    let params: BTreeMap<String, String> = match serde_urlencoded::from_str(&body) {
        Ok(params) => params,
        Err(e) => {
            tracing::warn!(error = %e, "webhook body is not valid form data");
            return (StatusCode::OK, "OK").into_response();
        }
    };

    if !verify(&state.webhook, &headers, &params) {
        return StatusCode::FORBIDDEN.into_response();
    }

    // Inbound message body: STOP-family keywords opt the sender out.
    if let (Some(text), Some(from)) = (params.get("Body"), params.get("From")) {
        if is_opt_out_keyword(text) {
            tracing::info!(from = %from, "inbound opt-out keyword received");
            if let Err(e) = state.service.record_opt_out(from).await {
                tracing::error!(error = %e, "failed to record webhook opt-out");
            }
        }
    }

    // Status callback: reconcile against the delivery log.
    if let (Some(sid), Some(raw_status)) = (params.get("MessageSid"), params.get("MessageStatus")) {
        match DeliveryStatus::from_str(raw_status) {
            Ok(status) => {
                let detail = error_detail(&params);
                if let Err(e) = state
                    .service
                    .reconcile_status(sid, status, detail.as_deref())
                    .await
                {
                    tracing::error!(sid = %sid, error = %e, "failed to reconcile delivery status");
                }
            }
            // Transient provider states ("sending", "accepted") carry no
            // information the log retains.
            Err(_) => {
                tracing::debug!(sid = %sid, status = %raw_status, "ignoring transient message status")
            }
        }
    }

    (StatusCode::OK, "OK").into_response()
}

/// GET /v1/sms/webhook
///
/// Liveness probe: the provider console fetches the callback URL when it is
/// saved, and expects a 2xx.
pub async fn get_webhook() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "endpoint": "sms-webhook",
    }))
}

fn verify(webhook: &WebhookState, headers: &HeaderMap, params: &BTreeMap<String, String>) -> bool {
    let Some(ref auth_token) = webhook.auth_token else {
        tracing::warn!("provider auth token not configured -- skipping signature verification");
        return true;
    };
    let Some(ref url) = webhook.callback_url else {
        tracing::warn!("public URL not configured -- skipping signature verification");
        return true;
    };

    let Some(signature) = headers
        .get("x-twilio-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("webhook request missing signature header");
        return false;
    };

    if validate_signature(auth_token, url, params, signature) {
        true
    } else {
        tracing::warn!("webhook signature mismatch");
        false
    }
}

fn error_detail(params: &BTreeMap<String, String>) -> Option<String> {
    let code = params.get("ErrorCode").filter(|s| !s.is_empty());
    let message = params.get("ErrorMessage").filter(|s| !s.is_empty());
    match (code, message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (Some(code), None) => Some(code.clone()),
        (None, Some(message)) => Some(message.clone()),
        (None, None) => None,
    }
}
