// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use fieldline_core::FieldlineError;
use fieldline_notify::SmsService;

use crate::auth::{api_key_middleware, AuthConfig};
use crate::handlers;
use crate::throttle::SendThrottle;
use crate::webhook::{self, WebhookState};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The notification dispatcher.
    pub service: Arc<SmsService>,
    /// Admin API auth settings.
    pub auth: AuthConfig,
    /// Webhook verification settings.
    pub webhook: WebhookState,
    /// Per-client throttle for the send endpoint.
    pub throttle: Arc<SendThrottle>,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the gateway router.
///
/// Routes:
/// - GET /health (public)
/// - POST|GET /v1/sms/webhook (public; POST verified via signature)
/// - POST /v1/sms/send (auth + throttle)
/// - GET /v1/sms/status, /v1/sms/logs, /v1/sms/stats, /v1/sms/opt-outs (auth)
/// - DELETE /v1/sms/opt-outs/{phone} (auth)
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route(
            "/v1/sms/webhook",
            post(webhook::post_webhook).get(webhook::get_webhook),
        )
        .with_state(state.clone());

    let send_route: Router<AppState> = Router::new()
        .route("/v1/sms/send", post(handlers::post_send))
        .route_layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state.throttle),
            crate::throttle::throttle_middleware,
        ));

    let admin_routes = Router::new()
        .merge(send_route)
        .route("/v1/sms/status", get(handlers::get_status))
        .route("/v1/sms/logs", get(handlers::get_logs))
        .route("/v1/sms/stats", get(handlers::get_stats))
        .route("/v1/sms/opt-outs", get(handlers::get_opt_outs))
        .route("/v1/sms/opt-outs/{phone}", delete(handlers::delete_opt_out))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            api_key_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server. Runs until the listener fails.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), FieldlineError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| FieldlineError::Transport {
                message: format!("failed to bind gateway to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| FieldlineError::Transport {
        message: format!("gateway server error: {e}"),
        source: Some(Box::new(e)),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
        assert!(debug.contains("8080"));
    }
}
