// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification dispatch for the Fieldline SMS service.
//!
//! The [`SmsService`] dispatcher runs the full send pipeline: phone
//! validation, configuration gate, consent check, rate limiting, template
//! rendering, transmission, and delivery logging. The consent ledger and
//! rate limiter live here too, wrapping the shared message store with the
//! deployment's store-failure policy.

pub mod consent;
pub mod ratelimit;
pub mod service;
pub mod template;

pub use consent::ConsentLedger;
pub use ratelimit::RateLimiter;
pub use service::{SendError, SendReceipt, SmsService, SmsServiceOptions};
pub use template::{render, template, OPT_OUT_SUFFIX};
