// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fieldline serve` command implementation.
//!
//! Composition root: wires config -> storage -> transport -> dispatcher ->
//! gateway, then runs the HTTP server until it fails or the process gets
//! a ctrl-c.

use std::sync::Arc;

use tracing::{info, warn};

use fieldline_config::model::FieldlineConfig;
use fieldline_core::{FieldlineError, MessageStore, SmsTransport};
use fieldline_gateway::{AppState, AuthConfig, SendThrottle, ServerConfig, WebhookState};
use fieldline_notify::{SmsService, SmsServiceOptions};
use fieldline_storage::SqliteStore;
use fieldline_twilio::TwilioClient;

/// Runs the `fieldline serve` command.
pub async fn run_serve(config: FieldlineConfig) -> Result<(), FieldlineError> {
    init_tracing(&config.log.level);

    info!("starting fieldline serve");

    let store = SqliteStore::open(&config.storage).await?;
    let store: Arc<dyn MessageStore> = Arc::new(store);

    let transport = build_transport(&config)?;
    let status_callback = webhook_url(&config);

    if transport.is_none() && !config.twilio.test_mode {
        warn!("provider credentials missing and test mode off -- sends will be refused");
    }
    if config.server.admin_api_key.is_none() {
        warn!("server.admin_api_key not set -- admin endpoints are unauthenticated");
    }

    let service = Arc::new(SmsService::new(
        Arc::clone(&store),
        transport,
        SmsServiceOptions {
            from_number: config.twilio.from_number.clone(),
            test_mode: config.twilio.test_mode,
            status_callback: status_callback.clone(),
            fail_open_on_store_error: config.sms.fail_open_on_store_error,
        },
    ));

    let state = AppState {
        service,
        auth: AuthConfig {
            api_key: config.server.admin_api_key.clone(),
        },
        webhook: WebhookState {
            auth_token: config.twilio.auth_token.clone(),
            callback_url: status_callback,
        },
        throttle: Arc::new(SendThrottle::default()),
    };

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    tokio::select! {
        result = fieldline_gateway::start_server(&server_config, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

/// Builds the provider transport when credentials are present.
fn build_transport(
    config: &FieldlineConfig,
) -> Result<Option<Arc<dyn SmsTransport>>, FieldlineError> {
    if !config.twilio.is_configured() {
        return Ok(None);
    }
    // is_configured() checked both fields.
    let (Some(account_sid), Some(auth_token)) =
        (&config.twilio.account_sid, &config.twilio.auth_token)
    else {
        return Ok(None);
    };
    let client = TwilioClient::new(account_sid.clone(), auth_token.clone())?;
    Ok(Some(Arc::new(client)))
}

/// Externally visible webhook URL, used both as the provider status
/// callback and for signature validation.
fn webhook_url(config: &FieldlineConfig) -> Option<String> {
    config
        .server
        .public_url
        .as_ref()
        .map(|url| format!("{}/v1/sms/webhook", url.trim_end_matches('/')))
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fieldline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
