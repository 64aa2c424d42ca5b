// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by the storage and transport crates.
//!
//! The dispatcher depends only on these traits, so tests substitute fakes
//! without touching environment variables or live services.

use async_trait::async_trait;

use crate::error::FieldlineError;
use crate::types::{
    DeliveryRecord, DeliveryStats, DeliveryStatus, OptOutEntry, OutboundSms, ProviderReceipt,
};

/// Persistent backing store for the delivery log and consent ledger.
///
/// Implementations must rely on the store's own row-level write atomicity;
/// no method is expected to span a transaction over multiple calls.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a delivery record. Returns the assigned row id.
    async fn append_delivery(&self, record: &DeliveryRecord) -> Result<i64, FieldlineError>;

    /// Apply a status transition looked up by provider message id.
    ///
    /// Returns false when no record matches the sid. That is not an error:
    /// the sid may reference a record outside the retained window.
    async fn update_delivery_status(
        &self,
        provider_sid: &str,
        status: DeliveryStatus,
        delivered_at: Option<&str>,
        error_detail: Option<&str>,
    ) -> Result<bool, FieldlineError>;

    /// Count delivery records for `phone` created at or after `since`
    /// (RFC 3339). Used for the trailing rate window.
    async fn count_recent_deliveries(
        &self,
        phone: &str,
        since: &str,
    ) -> Result<i64, FieldlineError>;

    /// Most recent delivery records, newest first.
    async fn list_deliveries(&self, limit: i64) -> Result<Vec<DeliveryRecord>, FieldlineError>;

    /// Aggregate statistics over an optional RFC 3339 time range.
    async fn delivery_stats(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<DeliveryStats, FieldlineError>;

    /// Whether `phone` has an active opt-out entry.
    async fn is_opted_out(&self, phone: &str) -> Result<bool, FieldlineError>;

    /// Record an opt-out. Idempotent: a second call refreshes the timestamp.
    async fn record_opt_out(&self, phone: &str, opted_out_at: &str)
        -> Result<(), FieldlineError>;

    /// Remove an opt-out entry. Returns whether one existed.
    async fn remove_opt_out(&self, phone: &str) -> Result<bool, FieldlineError>;

    /// List all opt-out entries, newest first.
    async fn list_opt_outs(&self) -> Result<Vec<OptOutEntry>, FieldlineError>;
}

/// Outbound SMS transmission provider.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Submit one message for delivery. Implementations must bound the call
    /// with a timeout; an indefinite hang is reported as a transport error.
    async fn send_message(&self, message: &OutboundSms) -> Result<ProviderReceipt, FieldlineError>;

    /// Short identifier for the provider ("twilio").
    fn provider_name(&self) -> &str;
}
