// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Fieldline SMS service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Fieldline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldlineConfig {
    /// Twilio provider credentials and sandbox flag.
    #[serde(default)]
    pub twilio: TwilioConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// SMS policy settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Twilio provider configuration.
///
/// All credential fields are optional: absence disables live sending (the
/// dispatcher reports "not configured" instead of erroring at startup).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TwilioConfig {
    /// Twilio account SID.
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Twilio auth token. Also used to validate webhook signatures.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender phone number in E.164 form.
    #[serde(default)]
    pub from_number: Option<String>,

    /// Sandbox mode: exercise the full pipeline (consent, rate limiting,
    /// logging) without calling the provider. Records get a synthetic sid.
    #[serde(default)]
    pub test_mode: bool,
}

impl TwilioConfig {
    /// True when all provider credentials are present.
    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret for the admin endpoints (`x-api-key` header).
    /// `None` disables the check (development mode, logged as a warning).
    #[serde(default)]
    pub admin_api_key: Option<String>,

    /// Externally reachable base URL, e.g. `https://sms.example.com`.
    /// Used to build the status-callback URL handed to the provider and to
    /// validate webhook signatures.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_api_key: None,
            public_url: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("fieldline").join("fieldline.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("fieldline.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// SMS policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Store-failure policy for consent and rate-limit lookups.
    ///
    /// `true` (default): a failed lookup admits the send, favoring delivery
    /// over strict enforcement. Flip to `false` for fail-closed deployments.
    #[serde(default = "default_fail_open")]
    pub fail_open_on_store_error: bool,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            fail_open_on_store_error: default_fail_open(),
        }
    }
}

fn default_fail_open() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
