// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consent ledger operations.

use fieldline_core::FieldlineError;
use rusqlite::params;

use crate::database::Database;
use crate::models::OptOutEntry;

/// Whether `phone` has an active opt-out entry.
pub async fn is_opted_out(db: &Database, phone: &str) -> Result<bool, FieldlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT 1 FROM opt_outs WHERE phone = ?1",
                params![phone],
                |_| Ok(()),
            );
            match result {
                Ok(()) => Ok(true),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record an opt-out. Idempotent upsert: a repeat call for the same phone
/// only refreshes the timestamp.
pub async fn record_opt_out(
    db: &Database,
    phone: &str,
    opted_out_at: &str,
) -> Result<(), FieldlineError> {
    let phone = phone.to_string();
    let opted_out_at = opted_out_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO opt_outs (phone, opted_out_at) VALUES (?1, ?2)
                 ON CONFLICT(phone) DO UPDATE SET opted_out_at = excluded.opted_out_at",
                params![phone, opted_out_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove an opt-out entry. Returns whether one existed.
pub async fn remove_opt_out(db: &Database, phone: &str) -> Result<bool, FieldlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute("DELETE FROM opt_outs WHERE phone = ?1", params![phone])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All opt-out entries, newest first.
pub async fn list_opt_outs(db: &Database) -> Result<Vec<OptOutEntry>, FieldlineError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT phone, opted_out_at FROM opt_outs ORDER BY opted_out_at DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(OptOutEntry {
                    phone: row.get(0)?,
                    opted_out_at: row.get(1)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn opt_out_roundtrip() {
        let (db, _dir) = setup_db().await;

        assert!(!is_opted_out(&db, "+18025550123").await.unwrap());

        record_opt_out(&db, "+18025550123", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        assert!(is_opted_out(&db, "+18025550123").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn record_opt_out_is_idempotent() {
        let (db, _dir) = setup_db().await;

        record_opt_out(&db, "+18025550123", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        record_opt_out(&db, "+18025550123", "2026-01-02T00:00:00.000Z")
            .await
            .unwrap();

        let entries = list_opt_outs(&db).await.unwrap();
        assert_eq!(entries.len(), 1, "exactly one entry per phone");
        assert_eq!(entries[0].opted_out_at, "2026-01-02T00:00:00.000Z");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn remove_opt_out_reports_existence() {
        let (db, _dir) = setup_db().await;

        record_opt_out(&db, "+18025550123", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();

        assert!(remove_opt_out(&db, "+18025550123").await.unwrap());
        assert!(!is_opted_out(&db, "+18025550123").await.unwrap());
        assert!(!remove_opt_out(&db, "+18025550123").await.unwrap());

        db.close().await.unwrap();
    }
}
