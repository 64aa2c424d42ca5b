// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery log operations.
//!
//! The log is append-only from the dispatcher's perspective; the only
//! mutation is the status transition applied during webhook reconciliation.

use std::str::FromStr;

use fieldline_core::FieldlineError;
use rusqlite::params;
use tracing::debug;

use crate::database::Database;
use crate::models::{DeliveryRecord, DeliveryStats, DeliveryStatus};

/// Insert a new delivery record. Returns the assigned row id.
pub async fn insert_delivery(db: &Database, record: &DeliveryRecord) -> Result<i64, FieldlineError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO deliveries (to_phone, from_phone, body, kind, status, provider_sid,
                                         cost, error_detail, sent_at, delivered_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.to_phone,
                    record.from_phone,
                    record.body,
                    record.kind.to_string(),
                    record.status.to_string(),
                    record.provider_sid,
                    record.cost,
                    record.error_detail,
                    record.sent_at,
                    record.delivered_at,
                    record.created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a status transition looked up by provider message id.
///
/// Returns false when no row matches; the caller logs and moves on.
/// `delivered_at` and `error_detail` only overwrite when provided.
pub async fn update_status_by_sid(
    db: &Database,
    provider_sid: &str,
    status: DeliveryStatus,
    delivered_at: Option<&str>,
    error_detail: Option<&str>,
) -> Result<bool, FieldlineError> {
    let provider_sid = provider_sid.to_string();
    let status = status.to_string();
    let delivered_at = delivered_at.map(|s| s.to_string());
    let error_detail = error_detail.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE deliveries
                 SET status = ?1,
                     delivered_at = COALESCE(?2, delivered_at),
                     error_detail = COALESCE(?3, error_detail)
                 WHERE provider_sid = ?4",
                params![status, delivered_at, error_detail, provider_sid],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count deliveries to `phone` created at or after `since` (RFC 3339).
///
/// RFC 3339 strings in a fixed format compare lexicographically, so this is
/// a plain string comparison in SQL.
pub async fn count_recent_for_phone(
    db: &Database,
    phone: &str,
    since: &str,
) -> Result<i64, FieldlineError> {
    let phone = phone.to_string();
    let since = since.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM deliveries WHERE to_phone = ?1 AND created_at >= ?2",
                params![phone, since],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent deliveries, newest first.
pub async fn list_deliveries(
    db: &Database,
    limit: i64,
) -> Result<Vec<DeliveryRecord>, FieldlineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, to_phone, from_phone, body, kind, status, provider_sid,
                        cost, error_detail, sent_at, delivered_at, created_at
                 FROM deliveries
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], record_from_row)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find a delivery by provider message id.
pub async fn get_by_sid(
    db: &Database,
    provider_sid: &str,
) -> Result<Option<DeliveryRecord>, FieldlineError> {
    let provider_sid = provider_sid.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, to_phone, from_phone, body, kind, status, provider_sid,
                        cost, error_detail, sent_at, delivered_at, created_at
                 FROM deliveries WHERE provider_sid = ?1",
            )?;
            let result = stmt.query_row(params![provider_sid], record_from_row);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Aggregate statistics over an optional RFC 3339 time range.
pub async fn delivery_stats(
    db: &Database,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<DeliveryStats, FieldlineError> {
    let from = from.map(|s| s.to_string());
    let to = to.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut stats = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN status = 'sent' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN status = 'delivered' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN status = 'undelivered' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(cost), 0.0)
                 FROM deliveries
                 WHERE (?1 IS NULL OR created_at >= ?1)
                   AND (?2 IS NULL OR created_at <= ?2)",
                params![from, to],
                |row| {
                    Ok(DeliveryStats {
                        total: row.get(0)?,
                        sent: row.get(1)?,
                        delivered: row.get(2)?,
                        failed: row.get(3)?,
                        undelivered: row.get(4)?,
                        total_cost: row.get(5)?,
                        by_kind: std::collections::HashMap::new(),
                    })
                },
            )?;

            let mut stmt = conn.prepare(
                "SELECT kind, COUNT(*)
                 FROM deliveries
                 WHERE (?1 IS NULL OR created_at >= ?1)
                   AND (?2 IS NULL OR created_at <= ?2)
                 GROUP BY kind",
            )?;
            let rows = stmt.query_map(params![from, to], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (kind, count) = row?;
                stats.by_kind.insert(kind, count);
            }

            debug!(total = stats.total, "computed delivery stats");
            Ok(stats)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Map one `deliveries` row to a [`DeliveryRecord`].
fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeliveryRecord> {
    Ok(DeliveryRecord {
        id: row.get(0)?,
        to_phone: row.get(1)?,
        from_phone: row.get(2)?,
        body: row.get(3)?,
        kind: parse_column(4, &row.get::<_, String>(4)?)?,
        status: parse_column(5, &row.get::<_, String>(5)?)?,
        provider_sid: row.get(6)?,
        cost: row.get(7)?,
        error_detail: row.get(8)?,
        sent_at: row.get(9)?,
        delivered_at: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Parse a TEXT column into a strum-backed enum.
fn parse_column<T: FromStr>(idx: usize, s: &str) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
