// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The notification dispatcher.
//!
//! [`SmsService`] is the single send entry point. Each call runs the
//! pipeline in strict order: validate, normalize, configuration gate,
//! consent check, rate check, render, transmit, log. Steps 1-5 short-circuit
//! without logging; every attempt that reaches rendering produces exactly
//! one delivery record, success and failure alike.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fieldline_core::types::{
    CanonicalPhone, DeliveryRecord, DeliveryStats, DeliveryStatus, NotificationKind, OptOutEntry,
    OutboundSms,
};
use fieldline_core::{phone, MessageStore, SmsTransport};

use crate::consent::ConsentLedger;
use crate::ratelimit::RateLimiter;
use crate::template;

/// From-number recorded for sandbox sends when no sender is configured.
const SANDBOX_FROM: &str = "TEST";

/// Prefix for synthetic sandbox message ids.
const SANDBOX_SID_PREFIX: &str = "test_";

/// Errors surfaced to callers of [`SmsService::send`].
///
/// Policy rejections (opted out, rate limited) are expected outcomes, not
/// faults. Transport failures carry a generic message only; provider detail
/// stays in the delivery log.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("invalid phone number format")]
    InvalidPhone,

    #[error("SMS service not configured")]
    NotConfigured,

    #[error("phone number has opted out")]
    OptedOut,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("failed to send message")]
    Transport,

    /// Fail-closed deployments only: a consent or rate lookup failed and
    /// the configured policy refuses to admit the send.
    #[error("message store unavailable")]
    StoreUnavailable,
}

/// Successful send outcome.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Provider message id, or a synthetic `test_` id in sandbox mode.
    pub message_id: String,
}

/// Constructor options for [`SmsService`].
#[derive(Debug, Clone, Default)]
pub struct SmsServiceOptions {
    /// Sender phone number in E.164 form.
    pub from_number: Option<String>,
    /// Sandbox mode: run the full pipeline without external transmission.
    pub test_mode: bool,
    /// Absolute status-callback URL handed to the provider.
    pub status_callback: Option<String>,
    /// Store-failure policy for consent and rate lookups.
    pub fail_open_on_store_error: bool,
}

/// The notification dispatcher.
///
/// Owned by the application's composition root; the store and transport are
/// constructor dependencies so tests substitute fakes directly.
pub struct SmsService {
    store: Arc<dyn MessageStore>,
    transport: Option<Arc<dyn SmsTransport>>,
    consent: ConsentLedger,
    limiter: RateLimiter,
    from_number: Option<String>,
    test_mode: bool,
    status_callback: Option<String>,
}

impl SmsService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        transport: Option<Arc<dyn SmsTransport>>,
        options: SmsServiceOptions,
    ) -> Self {
        let consent = ConsentLedger::new(Arc::clone(&store), options.fail_open_on_store_error);
        let limiter = RateLimiter::new(Arc::clone(&store), options.fail_open_on_store_error);
        Self {
            store,
            transport,
            consent,
            limiter,
            from_number: options.from_number,
            test_mode: options.test_mode,
            status_callback: options.status_callback,
        }
    }

    /// Whether the service can accept sends: a transport and sender number
    /// are present, or sandbox mode is on (which needs neither).
    pub fn is_configured(&self) -> bool {
        self.test_mode || (self.transport.is_some() && self.from_number.is_some())
    }

    /// Whether sandbox mode is active.
    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    /// Provider identifier for the status surface.
    pub fn provider_name(&self) -> &str {
        self.transport
            .as_deref()
            .map_or("twilio", SmsTransport::provider_name)
    }

    /// Send one notification. The single entry point for all collaborators.
    pub async fn send(
        &self,
        raw_phone: &str,
        kind: NotificationKind,
        vars: &HashMap<String, String>,
    ) -> Result<SendReceipt, SendError> {
        // 1. Validate. Nothing is logged for malformed input.
        if !phone::validate(raw_phone) {
            return Err(SendError::InvalidPhone);
        }

        // 2. Normalize to E.164.
        let to = phone::normalize(raw_phone);

        // 3. Global enablement gate.
        if !self.is_configured() {
            debug!(to = %to, kind = %kind, "send refused: service not configured");
            return Err(SendError::NotConfigured);
        }

        // 4. Consent. Runs before the rate check so a suppressed phone
        //    never consumes rate-window budget.
        if self.check_consent(&to).await? {
            info!(to = %to, kind = %kind, "send refused: phone has opted out");
            return Err(SendError::OptedOut);
        }

        // 5. Rate window.
        if !self.check_rate(&to).await? {
            info!(to = %to, kind = %kind, "send refused: rate limit exceeded");
            return Err(SendError::RateLimited);
        }

        // 6. Render.
        let body = template::render(kind, vars);
        let now = now_ts();

        // 7. Sandbox: full pipeline, no external call.
        if self.test_mode {
            let sid = format!("{SANDBOX_SID_PREFIX}{}", Uuid::new_v4().simple());
            let from = self
                .from_number
                .clone()
                .unwrap_or_else(|| SANDBOX_FROM.to_string());
            info!(to = %to, kind = %kind, sid = %sid, "sandbox send");
            self.append_record(DeliveryRecord {
                id: 0,
                to_phone: to.0.clone(),
                from_phone: from,
                body,
                kind,
                status: DeliveryStatus::Sent,
                provider_sid: Some(sid.clone()),
                cost: None,
                error_detail: None,
                sent_at: Some(now.clone()),
                delivered_at: None,
                created_at: now,
            })
            .await;
            return Ok(SendReceipt { message_id: sid });
        }

        // 8. Live transmission. is_configured() guarantees both are present
        //    outside sandbox mode.
        let (Some(transport), Some(from)) = (self.transport.as_ref(), self.from_number.as_ref())
        else {
            return Err(SendError::NotConfigured);
        };

        let outbound = OutboundSms {
            to: to.0.clone(),
            from: from.clone(),
            body: body.clone(),
            status_callback: self.status_callback.clone(),
        };

        match transport.send_message(&outbound).await {
            Ok(receipt) => {
                info!(to = %to, kind = %kind, sid = %receipt.sid, "message accepted by provider");
                self.append_record(DeliveryRecord {
                    id: 0,
                    to_phone: to.0.clone(),
                    from_phone: from.clone(),
                    body,
                    kind,
                    status: DeliveryStatus::Sent,
                    provider_sid: Some(receipt.sid.clone()),
                    cost: receipt.price,
                    error_detail: None,
                    sent_at: Some(now.clone()),
                    delivered_at: None,
                    created_at: now,
                })
                .await;
                Ok(SendReceipt {
                    message_id: receipt.sid,
                })
            }
            Err(e) => {
                warn!(to = %to, kind = %kind, error = %e, "provider rejected message");
                self.append_record(DeliveryRecord {
                    id: 0,
                    to_phone: to.0.clone(),
                    from_phone: from.clone(),
                    body,
                    kind,
                    status: DeliveryStatus::Failed,
                    provider_sid: None,
                    cost: None,
                    error_detail: Some(e.to_string()),
                    sent_at: Some(now.clone()),
                    delivered_at: None,
                    created_at: now,
                })
                .await;
                Err(SendError::Transport)
            }
        }
    }

    // --- Per-kind convenience wrappers (thin adapters, no extra logic) ---

    pub async fn send_appointment_confirmation(
        &self,
        phone: &str,
        customer_name: &str,
        date: &str,
        time: &str,
    ) -> Result<SendReceipt, SendError> {
        self.send(
            phone,
            NotificationKind::AppointmentConfirmation,
            &vars(&[("customerName", customer_name), ("date", date), ("time", time)]),
        )
        .await
    }

    pub async fn send_appointment_reminder(
        &self,
        phone: &str,
        date: &str,
        time: &str,
    ) -> Result<SendReceipt, SendError> {
        self.send(
            phone,
            NotificationKind::AppointmentReminder,
            &vars(&[("date", date), ("time", time)]),
        )
        .await
    }

    pub async fn send_quote_followup(
        &self,
        phone: &str,
        customer_name: &str,
    ) -> Result<SendReceipt, SendError> {
        self.send(
            phone,
            NotificationKind::QuoteFollowup,
            &vars(&[("customerName", customer_name)]),
        )
        .await
    }

    pub async fn send_emergency_response(
        &self,
        phone: &str,
        customer_name: &str,
    ) -> Result<SendReceipt, SendError> {
        self.send(
            phone,
            NotificationKind::EmergencyResponse,
            &vars(&[("customerName", customer_name)]),
        )
        .await
    }

    pub async fn send_status_update(
        &self,
        phone: &str,
        customer_name: &str,
        message: &str,
    ) -> Result<SendReceipt, SendError> {
        self.send(
            phone,
            NotificationKind::StatusUpdate,
            &vars(&[("customerName", customer_name), ("message", message)]),
        )
        .await
    }

    // --- Consent and reporting surface (used by the gateway) ---

    /// Record an opt-out for a raw phone number (normalized internally).
    pub async fn record_opt_out(&self, raw_phone: &str) -> Result<(), fieldline_core::FieldlineError> {
        let normalized = phone::normalize(raw_phone);
        self.consent.record_opt_out(&normalized).await
    }

    /// Remove an opt-out for a raw phone number. Returns whether one existed.
    pub async fn remove_opt_out(
        &self,
        raw_phone: &str,
    ) -> Result<bool, fieldline_core::FieldlineError> {
        let normalized = phone::normalize(raw_phone);
        self.consent.remove_opt_out(&normalized).await
    }

    /// All opt-out entries, newest first.
    pub async fn list_opt_outs(&self) -> Result<Vec<OptOutEntry>, fieldline_core::FieldlineError> {
        self.consent.list().await
    }

    /// Recent delivery records, newest first.
    pub async fn recent_deliveries(
        &self,
        limit: i64,
    ) -> Result<Vec<DeliveryRecord>, fieldline_core::FieldlineError> {
        self.store.list_deliveries(limit).await
    }

    /// Aggregate delivery statistics over an optional RFC 3339 range.
    pub async fn stats(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<DeliveryStats, fieldline_core::FieldlineError> {
        self.store.delivery_stats(from, to).await
    }

    /// Reconcile a provider status callback against the delivery log.
    ///
    /// Returns whether a record matched the sid. An unknown sid is a no-op:
    /// it may reference a record outside the retained window.
    pub async fn reconcile_status(
        &self,
        provider_sid: &str,
        status: DeliveryStatus,
        error_detail: Option<&str>,
    ) -> Result<bool, fieldline_core::FieldlineError> {
        let delivered_at = match status {
            DeliveryStatus::Delivered => Some(now_ts()),
            _ => None,
        };
        let matched = self
            .store
            .update_delivery_status(provider_sid, status, delivered_at.as_deref(), error_detail)
            .await?;
        if matched {
            debug!(sid = %provider_sid, status = %status, "delivery status reconciled");
        } else {
            warn!(sid = %provider_sid, status = %status, "status callback for unknown message id");
        }
        Ok(matched)
    }

    async fn check_consent(&self, to: &CanonicalPhone) -> Result<bool, SendError> {
        self.consent
            .is_opted_out(to)
            .await
            .map_err(|_| SendError::StoreUnavailable)
    }

    async fn check_rate(&self, to: &CanonicalPhone) -> Result<bool, SendError> {
        self.limiter
            .check_and_admit(to)
            .await
            .map_err(|_| SendError::StoreUnavailable)
    }

    /// Log append never fails a send that already happened: a store fault
    /// here is recorded in the logs only.
    async fn append_record(&self, record: DeliveryRecord) {
        if let Err(e) = self.store.append_delivery(&record).await {
            warn!(to = %record.to_phone, error = %e, "failed to append delivery record");
        }
    }
}

fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fieldline_core::types::ProviderReceipt;
    use fieldline_core::FieldlineError;
    use std::sync::Mutex;

    /// In-memory store with togglable lookup failures.
    #[derive(Default)]
    struct MemoryStore {
        deliveries: Mutex<Vec<DeliveryRecord>>,
        opt_outs: Mutex<Vec<OptOutEntry>>,
        fail_lookups: std::sync::atomic::AtomicBool,
    }

    impl MemoryStore {
        fn delivery_count(&self) -> usize {
            self.deliveries.lock().unwrap().len()
        }

        fn set_fail_lookups(&self, fail: bool) {
            self.fail_lookups
                .store(fail, std::sync::atomic::Ordering::SeqCst);
        }

        fn lookup_error(&self) -> Option<FieldlineError> {
            if self.fail_lookups.load(std::sync::atomic::Ordering::SeqCst) {
                Some(FieldlineError::Storage {
                    source: "simulated store outage".into(),
                })
            } else {
                None
            }
        }
    }

    #[async_trait]
    impl MessageStore for MemoryStore {
        async fn append_delivery(&self, record: &DeliveryRecord) -> Result<i64, FieldlineError> {
            let mut deliveries = self.deliveries.lock().unwrap();
            let mut record = record.clone();
            record.id = deliveries.len() as i64 + 1;
            let id = record.id;
            deliveries.push(record);
            Ok(id)
        }

        async fn update_delivery_status(
            &self,
            provider_sid: &str,
            status: DeliveryStatus,
            delivered_at: Option<&str>,
            error_detail: Option<&str>,
        ) -> Result<bool, FieldlineError> {
            let mut deliveries = self.deliveries.lock().unwrap();
            let Some(record) = deliveries
                .iter_mut()
                .find(|r| r.provider_sid.as_deref() == Some(provider_sid))
            else {
                return Ok(false);
            };
            record.status = status;
            if let Some(at) = delivered_at {
                record.delivered_at = Some(at.to_string());
            }
            if let Some(detail) = error_detail {
                record.error_detail = Some(detail.to_string());
            }
            Ok(true)
        }

        async fn count_recent_deliveries(
            &self,
            phone: &str,
            since: &str,
        ) -> Result<i64, FieldlineError> {
            if let Some(e) = self.lookup_error() {
                return Err(e);
            }
            let deliveries = self.deliveries.lock().unwrap();
            Ok(deliveries
                .iter()
                .filter(|r| r.to_phone == phone && r.created_at.as_str() >= since)
                .count() as i64)
        }

        async fn list_deliveries(&self, limit: i64) -> Result<Vec<DeliveryRecord>, FieldlineError> {
            let deliveries = self.deliveries.lock().unwrap();
            let mut records: Vec<_> = deliveries.iter().rev().cloned().collect();
            records.truncate(limit as usize);
            Ok(records)
        }

        async fn delivery_stats(
            &self,
            _from: Option<&str>,
            _to: Option<&str>,
        ) -> Result<DeliveryStats, FieldlineError> {
            let deliveries = self.deliveries.lock().unwrap();
            let mut stats = DeliveryStats {
                total: deliveries.len() as i64,
                ..Default::default()
            };
            for record in deliveries.iter() {
                match record.status {
                    DeliveryStatus::Sent => stats.sent += 1,
                    DeliveryStatus::Delivered => stats.delivered += 1,
                    DeliveryStatus::Failed => stats.failed += 1,
                    DeliveryStatus::Undelivered => stats.undelivered += 1,
                    DeliveryStatus::Queued => {}
                }
                stats.total_cost += record.cost.unwrap_or(0.0);
                *stats.by_kind.entry(record.kind.to_string()).or_insert(0) += 1;
            }
            Ok(stats)
        }

        async fn is_opted_out(&self, phone: &str) -> Result<bool, FieldlineError> {
            if let Some(e) = self.lookup_error() {
                return Err(e);
            }
            let opt_outs = self.opt_outs.lock().unwrap();
            Ok(opt_outs.iter().any(|o| o.phone == phone))
        }

        async fn record_opt_out(
            &self,
            phone: &str,
            opted_out_at: &str,
        ) -> Result<(), FieldlineError> {
            let mut opt_outs = self.opt_outs.lock().unwrap();
            if let Some(existing) = opt_outs.iter_mut().find(|o| o.phone == phone) {
                existing.opted_out_at = opted_out_at.to_string();
            } else {
                opt_outs.push(OptOutEntry {
                    phone: phone.to_string(),
                    opted_out_at: opted_out_at.to_string(),
                });
            }
            Ok(())
        }

        async fn remove_opt_out(&self, phone: &str) -> Result<bool, FieldlineError> {
            let mut opt_outs = self.opt_outs.lock().unwrap();
            let before = opt_outs.len();
            opt_outs.retain(|o| o.phone != phone);
            Ok(opt_outs.len() < before)
        }

        async fn list_opt_outs(&self) -> Result<Vec<OptOutEntry>, FieldlineError> {
            Ok(self.opt_outs.lock().unwrap().clone())
        }
    }

    /// Transport fake that records calls and can be set to reject.
    struct FakeTransport {
        calls: Mutex<Vec<OutboundSms>>,
        reject: bool,
    }

    impl FakeTransport {
        fn new(reject: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reject,
            }
        }
    }

    #[async_trait]
    impl SmsTransport for FakeTransport {
        async fn send_message(
            &self,
            message: &OutboundSms,
        ) -> Result<ProviderReceipt, FieldlineError> {
            self.calls.lock().unwrap().push(message.clone());
            if self.reject {
                Err(FieldlineError::Transport {
                    message: "Twilio error 21610: unreachable destination".into(),
                    source: None,
                })
            } else {
                Ok(ProviderReceipt {
                    sid: "SM-live".into(),
                    price: Some(0.0079),
                })
            }
        }

        fn provider_name(&self) -> &str {
            "twilio"
        }
    }

    fn sandbox_service(store: Arc<MemoryStore>) -> SmsService {
        SmsService::new(
            store,
            None,
            SmsServiceOptions {
                from_number: None,
                test_mode: true,
                status_callback: None,
                fail_open_on_store_error: true,
            },
        )
    }

    fn live_service(store: Arc<MemoryStore>, transport: Arc<FakeTransport>) -> SmsService {
        SmsService::new(
            store,
            Some(transport),
            SmsServiceOptions {
                from_number: Some("+18025550100".into()),
                test_mode: false,
                status_callback: Some("https://sms.example.com/v1/sms/webhook".into()),
                fail_open_on_store_error: true,
            },
        )
    }

    #[tokio::test]
    async fn invalid_phone_short_circuits_without_logging() {
        let store = Arc::new(MemoryStore::default());
        let service = sandbox_service(Arc::clone(&store));

        let err = service
            .send("555-0123", NotificationKind::StatusUpdate, &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err, SendError::InvalidPhone);
        assert_eq!(store.delivery_count(), 0);
    }

    #[tokio::test]
    async fn unconfigured_service_refuses_before_consent() {
        let store = Arc::new(MemoryStore::default());
        let service = SmsService::new(
            Arc::clone(&store) as Arc<dyn MessageStore>,
            None,
            SmsServiceOptions::default(),
        );

        assert!(!service.is_configured());
        let err = service
            .send("8025550123", NotificationKind::StatusUpdate, &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err, SendError::NotConfigured);
        assert_eq!(store.delivery_count(), 0);
    }

    #[tokio::test]
    async fn opted_out_phone_never_gets_a_record() {
        let store = Arc::new(MemoryStore::default());
        store
            .record_opt_out("+18025550123", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        let service = sandbox_service(Arc::clone(&store));

        for kind in [
            NotificationKind::AppointmentConfirmation,
            NotificationKind::EmergencyResponse,
            NotificationKind::StatusUpdate,
        ] {
            let err = service
                .send("802-555-0123", kind, &HashMap::new())
                .await
                .unwrap_err();
            assert_eq!(err, SendError::OptedOut);
        }
        assert_eq!(store.delivery_count(), 0);
    }

    #[tokio::test]
    async fn sixth_send_within_window_is_rate_limited() {
        let store = Arc::new(MemoryStore::default());
        let service = sandbox_service(Arc::clone(&store));

        for _ in 0..5 {
            service
                .send_status_update("8025550123", "Jo", "crew en route")
                .await
                .unwrap();
        }
        assert_eq!(store.delivery_count(), 5);

        let err = service
            .send_status_update("8025550123", "Jo", "crew en route")
            .await
            .unwrap_err();
        assert_eq!(err, SendError::RateLimited);
        assert_eq!(store.delivery_count(), 5, "rejected send must not log");

        // A different phone is unaffected.
        service
            .send_status_update("8025550199", "Sam", "crew en route")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rate_window_frees_up_after_an_hour() {
        let store = Arc::new(MemoryStore::default());
        let service = sandbox_service(Arc::clone(&store));

        // Five records well past the window boundary.
        for i in 0..5 {
            store
                .append_delivery(&DeliveryRecord {
                    id: 0,
                    to_phone: "+18025550123".into(),
                    from_phone: "TEST".into(),
                    body: "old".into(),
                    kind: NotificationKind::StatusUpdate,
                    status: DeliveryStatus::Sent,
                    provider_sid: Some(format!("test_old{i}")),
                    cost: None,
                    error_detail: None,
                    sent_at: None,
                    delivered_at: None,
                    created_at: "2020-01-01T00:00:00.000Z".into(),
                })
                .await
                .unwrap();
        }

        let receipt = service
            .send_status_update("8025550123", "Jo", "crew en route")
            .await
            .unwrap();
        assert!(receipt.message_id.starts_with("test_"));
    }

    #[tokio::test]
    async fn sandbox_send_logs_sent_record_with_synthetic_sid() {
        let store = Arc::new(MemoryStore::default());
        let service = sandbox_service(Arc::clone(&store));

        let receipt = service
            .send_emergency_response("8025550123", "Alex")
            .await
            .unwrap();
        assert!(receipt.message_id.starts_with("test_"));

        let records = store.list_deliveries(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DeliveryStatus::Sent);
        assert_eq!(records[0].to_phone, "+18025550123");
        assert!(records[0].body.contains("Alex"));
        assert!(
            !records[0].body.contains(template::OPT_OUT_SUFFIX),
            "emergency template omits the opt-out suffix"
        );
    }

    #[tokio::test]
    async fn live_send_records_sid_and_cost() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(FakeTransport::new(false));
        let service = live_service(Arc::clone(&store), Arc::clone(&transport));

        let receipt = service
            .send_appointment_confirmation("8025550123", "Jo", "May 2", "9:00 AM")
            .await
            .unwrap();
        assert_eq!(receipt.message_id, "SM-live");

        let records = store.list_deliveries(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].provider_sid.as_deref(), Some("SM-live"));
        assert_eq!(records[0].cost, Some(0.0079));

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to, "+18025550123");
        assert_eq!(
            calls[0].status_callback.as_deref(),
            Some("https://sms.example.com/v1/sms/webhook")
        );
    }

    #[tokio::test]
    async fn provider_failure_logs_failed_record_with_detail() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(FakeTransport::new(true));
        let service = live_service(Arc::clone(&store), transport);

        let err = service
            .send_quote_followup("8025550123", "Jo")
            .await
            .unwrap_err();
        // The caller gets the generic error, not provider internals.
        assert_eq!(err, SendError::Transport);
        assert_eq!(err.to_string(), "failed to send message");

        let records = store.list_deliveries(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DeliveryStatus::Failed);
        assert!(records[0]
            .error_detail
            .as_deref()
            .unwrap()
            .contains("21610"));
    }

    #[tokio::test]
    async fn store_outage_fails_open_by_default() {
        let store = Arc::new(MemoryStore::default());
        store.set_fail_lookups(true);
        let service = sandbox_service(Arc::clone(&store));

        let receipt = service
            .send_status_update("8025550123", "Jo", "crew en route")
            .await
            .unwrap();
        assert!(receipt.message_id.starts_with("test_"));
    }

    #[tokio::test]
    async fn store_outage_fails_closed_when_configured() {
        let store = Arc::new(MemoryStore::default());
        store.set_fail_lookups(true);
        let service = SmsService::new(
            Arc::clone(&store) as Arc<dyn MessageStore>,
            None,
            SmsServiceOptions {
                test_mode: true,
                fail_open_on_store_error: false,
                ..Default::default()
            },
        );

        let err = service
            .send_status_update("8025550123", "Jo", "crew en route")
            .await
            .unwrap_err();
        assert_eq!(err, SendError::StoreUnavailable);
        assert_eq!(store.delivery_count(), 0);
    }

    #[tokio::test]
    async fn reconcile_status_sets_delivered_at() {
        let store = Arc::new(MemoryStore::default());
        let service = sandbox_service(Arc::clone(&store));

        let receipt = service
            .send_status_update("8025550123", "Jo", "crew en route")
            .await
            .unwrap();

        let matched = service
            .reconcile_status(&receipt.message_id, DeliveryStatus::Delivered, None)
            .await
            .unwrap();
        assert!(matched);

        let records = store.list_deliveries(10).await.unwrap();
        assert_eq!(records[0].status, DeliveryStatus::Delivered);
        assert!(records[0].delivered_at.is_some());
    }

    #[tokio::test]
    async fn reconcile_unknown_sid_is_no_op() {
        let store = Arc::new(MemoryStore::default());
        let service = sandbox_service(store);

        let matched = service
            .reconcile_status("SM-unknown", DeliveryStatus::Delivered, None)
            .await
            .unwrap();
        assert!(!matched);
    }

    #[tokio::test]
    async fn opt_out_blocks_until_removed() {
        let store = Arc::new(MemoryStore::default());
        let service = sandbox_service(Arc::clone(&store));

        service.record_opt_out("802-555-0123").await.unwrap();
        let err = service
            .send_status_update("8025550123", "Jo", "hello")
            .await
            .unwrap_err();
        assert_eq!(err, SendError::OptedOut);

        assert!(service.remove_opt_out("8025550123").await.unwrap());
        service
            .send_status_update("8025550123", "Jo", "hello")
            .await
            .unwrap();
    }
}
