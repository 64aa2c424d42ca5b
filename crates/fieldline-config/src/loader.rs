// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./fieldline.toml` > `~/.config/fieldline/fieldline.toml`
//! > `/etc/fieldline/fieldline.toml` with environment variable overrides via
//! `FIELDLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FieldlineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/fieldline/fieldline.toml` (system-wide)
/// 3. `~/.config/fieldline/fieldline.toml` (user XDG config)
/// 4. `./fieldline.toml` (local directory)
/// 5. `FIELDLINE_*` environment variables
pub fn load_config() -> Result<FieldlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FieldlineConfig::default()))
        .merge(Toml::file("/etc/fieldline/fieldline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("fieldline/fieldline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("fieldline.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<FieldlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FieldlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FieldlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FieldlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `FIELDLINE_TWILIO_ACCOUNT_SID` must map
/// to `twilio.account_sid`, not `twilio.account.sid`.
fn env_provider() -> Env {
    Env::prefixed("FIELDLINE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: FIELDLINE_TWILIO_AUTH_TOKEN -> "twilio_auth_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("twilio_", "twilio.", 1)
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("sms_", "sms.", 1)
            .replacen("log_", "log.", 1);
        mapped.into()
    })
}
