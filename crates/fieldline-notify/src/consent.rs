// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opt-out consent ledger.
//!
//! Wraps the shared message store with the deployment's store-failure
//! policy. The default is fail-open: when the consent lookup itself fails,
//! the message is allowed through, favoring delivery over strict
//! enforcement. Flip `sms.fail_open_on_store_error` for fail-closed.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use fieldline_core::types::{CanonicalPhone, OptOutEntry};
use fieldline_core::{FieldlineError, MessageStore};
use tracing::{info, warn};

/// Keywords that, as the exact whole message body (case-insensitive,
/// trimmed), register an opt-out.
const OPT_OUT_KEYWORDS: &[&str] = &["stop", "unsubscribe", "cancel", "end", "quit"];

/// Returns true when an inbound message body is an opt-out request.
///
/// Exact whole-body match only: "please stop charging me" is a complaint,
/// not a consent withdrawal.
pub fn is_opt_out_keyword(body: &str) -> bool {
    let normalized = body.trim().to_lowercase();
    OPT_OUT_KEYWORDS.contains(&normalized.as_str())
}

/// Consent ledger over the shared message store.
#[derive(Clone)]
pub struct ConsentLedger {
    store: Arc<dyn MessageStore>,
    fail_open: bool,
}

impl ConsentLedger {
    pub fn new(store: Arc<dyn MessageStore>, fail_open: bool) -> Self {
        Self { store, fail_open }
    }

    /// Whether `phone` is suppressed.
    ///
    /// A store error resolves per the configured policy: fail-open treats
    /// the phone as not opted out (warning logged); fail-closed propagates.
    pub async fn is_opted_out(&self, phone: &CanonicalPhone) -> Result<bool, FieldlineError> {
        match self.store.is_opted_out(phone.as_str()).await {
            Ok(opted_out) => Ok(opted_out),
            Err(e) if self.fail_open => {
                warn!(phone = %phone, error = %e, "opt-out check failed, admitting (fail-open)");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Record an opt-out with the current timestamp. Idempotent.
    pub async fn record_opt_out(&self, phone: &CanonicalPhone) -> Result<(), FieldlineError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.store.record_opt_out(phone.as_str(), &now).await?;
        info!(phone = %phone, "opt-out recorded");
        Ok(())
    }

    /// Administrative un-suppression. Returns whether an entry existed.
    pub async fn remove_opt_out(&self, phone: &CanonicalPhone) -> Result<bool, FieldlineError> {
        let removed = self.store.remove_opt_out(phone.as_str()).await?;
        if removed {
            info!(phone = %phone, "opt-out removed");
        }
        Ok(removed)
    }

    /// All suppression entries, newest first.
    pub async fn list(&self) -> Result<Vec<OptOutEntry>, FieldlineError> {
        self.store.list_opt_outs().await
    }
}
