// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Fieldline service.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A phone number in E.164 wire format (`+<countrycode><number>`).
///
/// Produced by [`crate::phone::normalize`]; everything downstream of the
/// dispatcher's validation step deals in canonical phones only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalPhone(pub String);

impl CanonicalPhone {
    /// Returns the E.164 string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalPhone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of notification being sent. Each kind maps to exactly one template.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentConfirmation,
    AppointmentReminder,
    QuoteFollowup,
    EmergencyResponse,
    StatusUpdate,
}

/// Lifecycle status of a delivery attempt.
///
/// `Sent` is assigned at transmission time; the remaining terminal states
/// arrive later via the provider's status callback.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
    Undelivered,
}

/// One row in the delivery log. Append-only from the dispatcher's
/// perspective; status transitions are applied by the webhook reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Database rowid. Zero until inserted.
    #[serde(default)]
    pub id: i64,
    /// Destination phone, E.164.
    pub to_phone: String,
    /// Origin phone, E.164 (or a sandbox marker).
    pub from_phone: String,
    /// Fully rendered message text.
    pub body: String,
    /// Notification kind this record was rendered from.
    pub kind: NotificationKind,
    /// Current lifecycle status.
    pub status: DeliveryStatus,
    /// Provider-assigned message id. None until transmission succeeds.
    pub provider_sid: Option<String>,
    /// Cost reported by the provider, in USD.
    pub cost: Option<f64>,
    /// Error detail for failed or undelivered messages.
    pub error_detail: Option<String>,
    /// RFC 3339 timestamp of the transmission attempt.
    pub sent_at: Option<String>,
    /// RFC 3339 timestamp of confirmed delivery, set by the reconciler.
    pub delivered_at: Option<String>,
    /// RFC 3339 timestamp of row creation.
    pub created_at: String,
}

/// A suppression entry in the consent ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptOutEntry {
    /// Phone number, E.164, unique.
    pub phone: String,
    /// RFC 3339 timestamp of the (most recent) opt-out.
    pub opted_out_at: String,
}

/// Aggregate delivery statistics for a time range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub total: i64,
    pub sent: i64,
    pub delivered: i64,
    pub failed: i64,
    pub undelivered: i64,
    pub total_cost: f64,
    /// Counts keyed by notification kind string.
    pub by_kind: std::collections::HashMap<String, i64>,
}

/// An outbound message handed to an [`crate::traits::SmsTransport`].
#[derive(Debug, Clone)]
pub struct OutboundSms {
    pub to: String,
    pub from: String,
    pub body: String,
    /// Absolute URL the provider should POST status callbacks to.
    pub status_callback: Option<String>,
}

/// What the provider reports back for an accepted message.
#[derive(Debug, Clone)]
pub struct ProviderReceipt {
    /// Provider-assigned message id.
    pub sid: String,
    /// Price in USD, when the provider reports one.
    pub price: Option<f64>,
}
