// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Fieldline SMS notification service.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Fieldline workspace: phone number
//! handling, delivery lifecycle types, and the adapter traits implemented
//! by the storage and transport crates.

pub mod error;
pub mod phone;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::FieldlineError;
pub use traits::{MessageStore, SmsTransport};
pub use types::{
    CanonicalPhone, DeliveryRecord, DeliveryStats, DeliveryStatus, NotificationKind, OptOutEntry,
    OutboundSms, ProviderReceipt,
};
