// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-phone outbound rate limiting.
//!
//! The window is derived from the delivery log at send time, not cached.
//! The check is advisory: it is not atomic with the subsequent insert, so
//! two concurrent sends can both pass and exceed the cap by one. The
//! limiter is a courtesy throttle, not a billing guarantee.

use std::sync::Arc;

use chrono::{Duration, SecondsFormat, Utc};
use fieldline_core::types::CanonicalPhone;
use fieldline_core::{FieldlineError, MessageStore};
use tracing::warn;

/// Maximum messages per destination phone per window.
pub const RATE_LIMIT_PER_WINDOW: i64 = 5;

/// Trailing window length in minutes.
pub const RATE_LIMIT_WINDOW_MINUTES: i64 = 60;

/// Rate limiter over the shared message store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn MessageStore>,
    fail_open: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn MessageStore>, fail_open: bool) -> Self {
        Self { store, fail_open }
    }

    /// Returns true when a send to `phone` is within the rate window.
    ///
    /// A store error resolves per the configured policy: fail-open admits
    /// (warning logged); fail-closed propagates.
    pub async fn check_and_admit(&self, phone: &CanonicalPhone) -> Result<bool, FieldlineError> {
        let since = (Utc::now() - Duration::minutes(RATE_LIMIT_WINDOW_MINUTES))
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        match self.store.count_recent_deliveries(phone.as_str(), &since).await {
            Ok(count) => Ok(count < RATE_LIMIT_PER_WINDOW),
            Err(e) if self.fail_open => {
                warn!(phone = %phone, error = %e, "rate check failed, admitting (fail-open)");
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }
}
