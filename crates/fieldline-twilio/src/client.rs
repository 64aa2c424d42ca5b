// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Twilio Messages API.
//!
//! One API call per send: create message with body, from, to, and an
//! optional status-callback URL. The response yields the provider message
//! sid and, when Twilio reports one, the price.

use std::time::Duration;

use async_trait::async_trait;
use fieldline_core::{FieldlineError, OutboundSms, ProviderReceipt, SmsTransport};
use serde::Deserialize;
use tracing::{debug, warn};

/// Base URL for the Twilio REST API.
const API_BASE_URL: &str = "https://api.twilio.com";

/// Bound on the create-message call. An indefinite provider hang becomes a
/// failed send rather than a wedged request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for Twilio message creation.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    base_url: String,
}

/// Successful create-message response (the fields we consume).
#[derive(Debug, Deserialize)]
struct MessageCreated {
    sid: String,
    /// Twilio reports price as a decimal string, usually null at creation.
    price: Option<String>,
}

/// Twilio error envelope for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    message: String,
}

impl TwilioClient {
    /// Creates a new Twilio API client.
    pub fn new(account_sid: String, auth_token: String) -> Result<Self, FieldlineError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FieldlineError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            account_sid,
            auth_token,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

#[async_trait]
impl SmsTransport for TwilioClient {
    async fn send_message(
        &self,
        message: &OutboundSms,
    ) -> Result<ProviderReceipt, FieldlineError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("To", message.to.as_str()),
            ("From", message.from.as_str()),
            ("Body", message.body.as_str()),
        ];
        if let Some(callback) = &message.status_callback {
            form.push(("StatusCallback", callback.as_str()));
        }

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FieldlineError::Timeout {
                        duration: REQUEST_TIMEOUT,
                    }
                } else {
                    FieldlineError::Transport {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        debug!(status = %status, to = %message.to, "create-message response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ApiError>(&body) {
                Ok(err) => match err.code {
                    Some(code) => format!("Twilio error {code}: {}", err.message),
                    None => format!("Twilio error: {}", err.message),
                },
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(FieldlineError::Transport {
                message: detail,
                source: None,
            });
        }

        let body = response.text().await.map_err(|e| FieldlineError::Transport {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        let created: MessageCreated =
            serde_json::from_str(&body).map_err(|e| FieldlineError::Transport {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let price = created.price.as_deref().and_then(|p| {
            let parsed = p.parse::<f64>().ok();
            if parsed.is_none() {
                warn!(price = %p, "unparseable price in provider response");
            }
            // Twilio prices are negative charges ("-0.0079"); store magnitude.
            parsed.map(f64::abs)
        });

        Ok(ProviderReceipt {
            sid: created.sid,
            price,
        })
    }

    fn provider_name(&self) -> &str {
        "twilio"
    }
}
