// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the MessageStore trait.

use async_trait::async_trait;
use tracing::debug;

use fieldline_config::model::StorageConfig;
use fieldline_core::types::{DeliveryRecord, DeliveryStats, DeliveryStatus, OptOutEntry};
use fieldline_core::{FieldlineError, MessageStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed message store.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query modules. One instance is shared by the dispatcher and the webhook
/// reconciler; tokio-rusqlite serializes access on its background thread.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database at the configured path and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, FieldlineError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store opened");
        Ok(Self { db })
    }

    /// Checkpoint the WAL and close the store.
    pub async fn close(self) -> Result<(), FieldlineError> {
        self.db.close().await
    }

    /// Returns a reference to the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append_delivery(&self, record: &DeliveryRecord) -> Result<i64, FieldlineError> {
        queries::deliveries::insert_delivery(&self.db, record).await
    }

    async fn update_delivery_status(
        &self,
        provider_sid: &str,
        status: DeliveryStatus,
        delivered_at: Option<&str>,
        error_detail: Option<&str>,
    ) -> Result<bool, FieldlineError> {
        queries::deliveries::update_status_by_sid(
            &self.db,
            provider_sid,
            status,
            delivered_at,
            error_detail,
        )
        .await
    }

    async fn count_recent_deliveries(
        &self,
        phone: &str,
        since: &str,
    ) -> Result<i64, FieldlineError> {
        queries::deliveries::count_recent_for_phone(&self.db, phone, since).await
    }

    async fn list_deliveries(&self, limit: i64) -> Result<Vec<DeliveryRecord>, FieldlineError> {
        queries::deliveries::list_deliveries(&self.db, limit).await
    }

    async fn delivery_stats(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<DeliveryStats, FieldlineError> {
        queries::deliveries::delivery_stats(&self.db, from, to).await
    }

    async fn is_opted_out(&self, phone: &str) -> Result<bool, FieldlineError> {
        queries::opt_outs::is_opted_out(&self.db, phone).await
    }

    async fn record_opt_out(
        &self,
        phone: &str,
        opted_out_at: &str,
    ) -> Result<(), FieldlineError> {
        queries::opt_outs::record_opt_out(&self.db, phone, opted_out_at).await
    }

    async fn remove_opt_out(&self, phone: &str) -> Result<bool, FieldlineError> {
        queries::opt_outs::remove_opt_out(&self.db, phone).await
    }

    async fn list_opt_outs(&self) -> Result<Vec<OptOutEntry>, FieldlineError> {
        queries::opt_outs::list_opt_outs(&self.db).await
    }
}
