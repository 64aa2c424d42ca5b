// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory per-client request throttle for the send endpoint.
//!
//! Distinct from the per-phone rate limiter in `fieldline-notify`: this one
//! protects the HTTP surface itself, keyed by client address, and resets on
//! restart.

use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

/// Maximum send requests per client per window.
pub const THROTTLE_LIMIT: usize = 10;

/// Throttle window length.
pub const THROTTLE_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window counter keyed by client address.
pub struct SendThrottle {
    hits: DashMap<String, Vec<Instant>>,
    limit: usize,
    window: Duration,
}

impl Default for SendThrottle {
    fn default() -> Self {
        Self::new(THROTTLE_LIMIT, THROTTLE_WINDOW)
    }
}

impl SendThrottle {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            hits: DashMap::new(),
            limit,
            window,
        }
    }

    /// Record a hit for `client` and return whether it is admitted.
    pub fn admit(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.hits.entry(client.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        if entry.len() >= self.limit {
            return false;
        }
        entry.push(now);
        true
    }
}

/// Client key for throttling: first `X-Forwarded-For` entry when present
/// (reverse-proxy deployments), else the socket peer address.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware applying the send-endpoint throttle.
pub async fn throttle_middleware(
    State(throttle): State<std::sync::Arc<SendThrottle>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let client = client_key(&request);
    if !throttle.admit(&client) {
        tracing::warn!(client = %client, "send endpoint throttled");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }
    Ok(next.run(request).await)
}
