// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio integration for the Fieldline SMS service.
//!
//! Provides [`TwilioClient`], an [`SmsTransport`](fieldline_core::SmsTransport)
//! implementation over the Twilio Messages REST API, and webhook signature
//! computation/validation for status callbacks.

pub mod client;
pub mod signature;

pub use client::TwilioClient;
pub use signature::{compute_signature, validate_signature};
