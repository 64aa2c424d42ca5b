// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static message templates and `{{placeholder}}` substitution.
//!
//! Templates are fixed content per notification kind, compiled in. Every
//! body carries the opt-out suffix except the emergency response, which
//! omits it for urgency.

use std::collections::HashMap;

use fieldline_core::types::NotificationKind;
use tracing::warn;

/// Standard compliance suffix appended to non-emergency templates.
pub const OPT_OUT_SUFFIX: &str = "Reply STOP to opt out.";

/// An immutable message template.
///
/// `required_vars` documents the placeholders the body expects; it is not
/// enforced at render time — callers own supplying a complete variable bag.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub kind: NotificationKind,
    pub body: &'static str,
    pub required_vars: &'static [&'static str],
}

const APPOINTMENT_CONFIRMATION: Template = Template {
    kind: NotificationKind::AppointmentConfirmation,
    body: "Hi {{customerName}}, your electrical service appointment is confirmed for {{date}} \
           at {{time}}. We'll see you then! Reply STOP to opt out.",
    required_vars: &["customerName", "date", "time"],
};

const APPOINTMENT_REMINDER: Template = Template {
    kind: NotificationKind::AppointmentReminder,
    body: "Reminder: you have an electrical service appointment tomorrow ({{date}}) at \
           {{time}}. We look forward to serving you! Reply STOP to opt out.",
    required_vars: &["date", "time"],
};

const QUOTE_FOLLOWUP: Template = Template {
    kind: NotificationKind::QuoteFollowup,
    body: "Hi {{customerName}}, your electrical service quote is ready. Check your email for \
           details or give us a call. Thank you! Reply STOP to opt out.",
    required_vars: &["customerName"],
};

const EMERGENCY_RESPONSE: Template = Template {
    kind: NotificationKind::EmergencyResponse,
    body: "Hi {{customerName}}, we've received your emergency electrical service request. \
           A technician will contact you within 15 minutes.",
    required_vars: &["customerName"],
};

const STATUS_UPDATE: Template = Template {
    kind: NotificationKind::StatusUpdate,
    body: "Hi {{customerName}}, update on your electrical service: {{message}}. Questions? \
           Give us a call. Reply STOP to opt out.",
    required_vars: &["customerName", "message"],
};

/// Returns the fixed template for a notification kind.
pub fn template(kind: NotificationKind) -> &'static Template {
    match kind {
        NotificationKind::AppointmentConfirmation => &APPOINTMENT_CONFIRMATION,
        NotificationKind::AppointmentReminder => &APPOINTMENT_REMINDER,
        NotificationKind::QuoteFollowup => &QUOTE_FOLLOWUP,
        NotificationKind::EmergencyResponse => &EMERGENCY_RESPONSE,
        NotificationKind::StatusUpdate => &STATUS_UPDATE,
    }
}

/// Render the template for `kind`, substituting every `{{name}}` placeholder
/// with the matching entry in `vars` (exact, case-sensitive key match).
///
/// Placeholders with no matching variable are left in the output; that is a
/// caller bug, surfaced as a warning rather than an error so a missing
/// variable never blocks an otherwise-valid notification.
pub fn render(kind: NotificationKind, vars: &HashMap<String, String>) -> String {
    let mut body = template(kind).body.to_string();
    for (key, value) in vars {
        body = body.replace(&format!("{{{{{key}}}}}"), value);
    }

    if body.contains("{{") {
        warn!(kind = %kind, "rendered message contains unresolved placeholders");
    }
    body
}
