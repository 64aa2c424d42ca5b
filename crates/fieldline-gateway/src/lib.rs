// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Fieldline SMS service.
//!
//! Serves two surfaces from one axum router: the provider-facing webhook
//! (status callbacks and inbound opt-outs, verified by signature) and the
//! admin API (send, status, logs, stats, consent administration) behind a
//! shared-secret header.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod throttle;
pub mod webhook;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, AppState, ServerConfig};
pub use throttle::SendThrottle;
pub use webhook::WebhookState;
