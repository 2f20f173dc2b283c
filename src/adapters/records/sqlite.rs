//! SQLite implementation of RecordSink and RecordReader.
//!
//! Each finalized entity is one row in `records`. The
//! `UNIQUE(batch_id, position)` constraint plus `INSERT OR IGNORE` makes a
//! retried batch a no-op.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use crate::domain::extraction::FinalizeBatch;
use crate::domain::foundation::{BatchId, ThreadId, Timestamp};
use crate::ports::{RecordReader, RecordSink, RecordStoreError, StoredRecord};

/// SQLite-backed record store.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Wraps an existing pool. Call [`SqliteRecordStore::migrate`] before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and runs migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RecordStoreError> {
        if let Some(parent) = database_dir(url) {
            tokio::fs::create_dir_all(&parent).await.map_err(|e| {
                RecordStoreError::Unavailable(format!("Failed to create {}: {}", parent, e))
            })?;
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| RecordStoreError::Unavailable(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| RecordStoreError::Unavailable(format!("Failed to connect: {}", e)))?;

        let store = Self::new(pool);
        store.migrate().await?;
        tracing::info!(url = %url, "Record store ready");
        Ok(store)
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), RecordStoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(format!("Migration failed: {}", e)))
    }
}

/// Directory holding a file-backed database, if any.
fn database_dir(url: &str) -> Option<String> {
    let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty())
}

fn db_error(context: &str) -> impl Fn(sqlx::Error) -> RecordStoreError + '_ {
    move |e| RecordStoreError::Database(format!("{}: {}", context, e))
}

#[async_trait]
impl RecordSink for SqliteRecordStore {
    async fn persist(&self, batch: &FinalizeBatch) -> Result<(), RecordStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let mut inserted = 0u64;
        for (position, entity) in batch.entities.iter().enumerate() {
            let data = serde_json::to_string(&entity.fields.to_json())
                .map_err(|e| RecordStoreError::Serialization(e.to_string()))?;

            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO records (
                    batch_id, position, thread_id, entity_type, date, data, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(batch.batch_id.to_string())
            .bind(position as i64)
            .bind(batch.thread_id.as_str())
            .bind(&entity.entity_type)
            .bind(batch.finalized_at.date())
            .bind(data)
            .bind(*batch.finalized_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert record"))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        tracing::debug!(
            batch_id = %batch.batch_id,
            entities = batch.entities.len(),
            inserted,
            "Persisted finalize batch"
        );
        Ok(())
    }
}

#[async_trait]
impl RecordReader for SqliteRecordStore {
    async fn entity_types(&self, thread_id: &ThreadId) -> Result<Vec<String>, RecordStoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT entity_type FROM records WHERE thread_id = ? ORDER BY entity_type",
        )
        .bind(thread_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list entity types"))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("entity_type")
                    .map_err(db_error("Failed to read entity type"))
            })
            .collect()
    }

    async fn recent(
        &self,
        thread_id: &ThreadId,
        entity_type: &str,
        limit: u32,
    ) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT batch_id, position, thread_id, entity_type, date, data, created_at
            FROM records
            WHERE thread_id = ? AND entity_type = ?
            ORDER BY date DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(thread_id.as_str())
        .bind(entity_type)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to read records"))?;

        rows.iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<StoredRecord, RecordStoreError> {
    let read = db_error("Failed to decode record");
    let batch_id: String = row.try_get("batch_id").map_err(&read)?;
    let position: i64 = row.try_get("position").map_err(&read)?;
    let thread_id: String = row.try_get("thread_id").map_err(&read)?;
    let entity_type: String = row.try_get("entity_type").map_err(&read)?;
    let date: NaiveDate = row.try_get("date").map_err(&read)?;
    let data: String = row.try_get("data").map_err(&read)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(&read)?;

    let corrupt = |what: &str, e: String| RecordStoreError::Serialization(format!("{}: {}", what, e));
    Ok(StoredRecord {
        batch_id: BatchId::from_str(&batch_id).map_err(|e| corrupt("batch_id", e.to_string()))?,
        position: position as u32,
        thread_id: ThreadId::new(thread_id).map_err(|e| corrupt("thread_id", e.to_string()))?,
        entity_type,
        date,
        data: serde_json::from_str(&data).map_err(|e| corrupt("data", e.to_string()))?,
        created_at: Timestamp::from_datetime(created_at),
    })
}
