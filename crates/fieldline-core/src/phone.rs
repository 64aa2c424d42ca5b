// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! US phone number validation and E.164 normalization.
//!
//! Accepts NANP numbers only: 10 digits, or 11 digits with a leading `1`.
//! Formatting characters (dashes, dots, parens, spaces) are ignored.

use crate::types::CanonicalPhone;

/// Returns true when `raw` contains exactly 10 digits, or 11 digits with a
/// leading `1`, ignoring all non-digit characters. Everything else,
/// including already-formatted international numbers from other countries,
/// is rejected.
pub fn validate(raw: &str) -> bool {
    let digits: Vec<u8> = raw.bytes().filter(u8::is_ascii_digit).collect();
    match digits.len() {
        10 => true,
        11 => digits.first() == Some(&b'1'),
        _ => false,
    }
}

/// Normalizes `raw` to E.164 form (`+1XXXXXXXXXX`).
///
/// Does NOT re-validate: callers must run [`validate`] first. Input that is
/// neither a 10/11-digit NANP number nor `+`-prefixed is passed through with
/// a `+1` prefix on whatever digits it contains.
pub fn normalize(raw: &str) -> CanonicalPhone {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.len() == 10 {
        return CanonicalPhone(format!("+1{digits}"));
    }
    if digits.len() == 11 && digits.starts_with('1') {
        return CanonicalPhone(format!("+{digits}"));
    }
    // Already E.164-looking input passes through unchanged.
    if raw.starts_with('+') {
        return CanonicalPhone(raw.to_string());
    }

    CanonicalPhone(format!("+1{digits}"))
}
