// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio webhook signature validation.
//!
//! Twilio signs each callback by appending the POST parameters (sorted by
//! key, key then value, no separators) to the full callback URL, computing
//! HMAC-SHA1 over the result with the account auth token, and base64
//! encoding the digest into the `X-Twilio-Signature` header.

use std::collections::BTreeMap;

use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Compute the expected signature for a callback.
///
/// `params` must be the decoded form fields; `BTreeMap` supplies the sorted
/// key order the scheme requires.
pub fn compute_signature(auth_token: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let mut data = String::from(url);
    for (key, value) in params {
        data.push_str(key);
        data.push_str(value);
    }

    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Validate a received `X-Twilio-Signature` header value.
///
/// Comparison is constant-time via the HMAC verifier.
pub fn validate_signature(
    auth_token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
    signature: &str,
) -> bool {
    let Ok(provided) = base64::engine::general_purpose::STANDARD.decode(signature) else {
        return false;
    };

    let mut data = String::from(url);
    for (key, value) in params {
        data.push_str(key);
        data.push_str(value);
    }

    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("MessageSid".to_string(), "SM123".to_string());
        params.insert("MessageStatus".to_string(), "delivered".to_string());
        params.insert("To".to_string(), "+18025550123".to_string());
        params.insert("From".to_string(), "+18025550100".to_string());
        params.insert("AccountSid".to_string(), "AC-test".to_string());
        params
    }

    #[test]
    fn computed_signature_validates() {
        let url = "https://sms.example.com/v1/sms/webhook";
        let params = sample_params();
        let sig = compute_signature("token-test", url, &params);
        assert!(validate_signature("token-test", url, &params, &sig));
    }

    #[test]
    fn tampered_params_rejected() {
        let url = "https://sms.example.com/v1/sms/webhook";
        let mut params = sample_params();
        let sig = compute_signature("token-test", url, &params);

        params.insert("MessageStatus".to_string(), "failed".to_string());
        assert!(!validate_signature("token-test", url, &params, &sig));
    }

    #[test]
    fn wrong_token_rejected() {
        let url = "https://sms.example.com/v1/sms/webhook";
        let params = sample_params();
        let sig = compute_signature("token-test", url, &params);
        assert!(!validate_signature("other-token", url, &params, &sig));
    }

    #[test]
    fn wrong_url_rejected() {
        let params = sample_params();
        let sig = compute_signature("token-test", "https://sms.example.com/v1/sms/webhook", &params);
        assert!(!validate_signature(
            "token-test",
            "https://evil.example.com/v1/sms/webhook",
            &params,
            &sig
        ));
    }

    #[test]
    fn non_base64_signature_rejected() {
        let params = sample_params();
        assert!(!validate_signature(
            "token-test",
            "https://sms.example.com/v1/sms/webhook",
            &params,
            "not base64 at all!!!"
        ));
    }
}
