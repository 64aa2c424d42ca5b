// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as partial provider credentials or a malformed public URL.

use thiserror::Error;

use crate::model::FieldlineConfig;

/// A configuration error surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A semantic validation failure for a config value.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A Figment parse/merge error.
    #[error("configuration error: {0}")]
    Parse(String),
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FieldlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    if config.server.port == 0 {
        errors.push(ConfigError::Validation {
            message: "server.port must not be 0".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if let Some(url) = &config.server.public_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ConfigError::Validation {
                message: format!(
                    "server.public_url must start with http:// or https://, got `{url}`"
                ),
            });
        }
    }

    // Partial Twilio credentials are almost certainly a deployment mistake:
    // either configure all three or none.
    let creds_set = [
        config.twilio.account_sid.is_some(),
        config.twilio.auth_token.is_some(),
        config.twilio.from_number.is_some(),
    ];
    let set_count = creds_set.iter().filter(|&&s| s).count();
    if set_count > 0 && set_count < 3 {
        errors.push(ConfigError::Validation {
            message: "twilio credentials are partial: set all of account_sid, auth_token, \
                      and from_number, or none"
                .to_string(),
        });
    }

    if let Some(from) = &config.twilio.from_number {
        if !from.starts_with('+') {
            errors.push(ConfigError::Validation {
                message: format!("twilio.from_number must be E.164 (start with `+`), got `{from}`"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
