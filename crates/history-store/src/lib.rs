//! SQLite-backed conversion history.
//!
//! Rows are appended on save and never updated or deleted. Ids come from
//! `AUTOINCREMENT`, timestamps from the column default at insert time.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use converters::NewHistoryRecord;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

/// Number of rows `recent` returns.
pub const HISTORY_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open history store: {0}")]
    Connect(String),
    #[error("failed to create history table: {0}")]
    Migration(String),
    #[error("history query failed: {0}")]
    Query(String),
    #[error("corrupt history row: {0}")]
    Decode(String),
}

/// One persisted conversion, in its wire shape
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i64,
    #[serde(rename = "type")]
    pub category: String,
    pub from_unit: String,
    pub to_unit: String,
    pub input_value: f64,
    pub result: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    pub ts: DateTime<Utc>,
}

type HistoryRow = (i64, String, String, String, f64, f64, Option<String>, String);

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, StoreError> {
        let (id, category, from_unit, to_unit, input_value, result, direction, ts) = row;
        let ts = DateTime::parse_from_rfc3339(&ts)
            .map_err(|e| StoreError::Decode(format!("row {id}: bad ts {ts:?}: {e}")))?
            .with_timezone(&Utc);
        Ok(HistoryRecord { id, category, from_unit, to_unit, input_value, result, direction, ts })
    }
}

fn is_memory_url(url: &str) -> bool {
    matches!(url.trim(), "" | "sqlite://" | "sqlite::memory:" | ":memory:" | "memory")
}

fn sqlite_path_from_url(url: &str) -> &str {
    let url = url.trim();
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

#[derive(Clone, Debug)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    /// Open the store at `url` and create the history table if needed.
    ///
    /// `sqlite::memory:` (or an empty url) gives a private in-memory store held
    /// by a single pooled connection; anything else is a file path, with or
    /// without a `sqlite://` prefix, created when missing.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = if is_memory_url(url) {
            let opts = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StoreError::Connect(e.to_string()))?;
            // one connection that never idles out, or the database vanishes
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(opts)
                .await
        } else {
            let opts = SqliteConnectOptions::new()
                .filename(sqlite_path_from_url(url))
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                // concurrent writers wait for the lock instead of failing
                .busy_timeout(Duration::from_secs(5));
            SqlitePoolOptions::new().max_connections(5).connect_with(opts).await
        }
        .map_err(|e| StoreError::Connect(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// CREATE TABLE IF NOT EXISTS; there is no versioned schema.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                "type" TEXT NOT NULL,
                "fromUnit" TEXT NOT NULL,
                "toUnit" TEXT NOT NULL,
                "inputValue" REAL NOT NULL,
                result REAL NOT NULL,
                direction TEXT,
                ts TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(e.to_string()))?;
        tracing::debug!("history table ready");
        Ok(())
    }

    /// Append one record. Not idempotent: identical calls make identical rows.
    pub async fn save(&self, rec: &NewHistoryRecord) -> Result<i64, StoreError> {
        let done = sqlx::query(
            r#"INSERT INTO history ("type", "fromUnit", "toUnit", "inputValue", result, direction)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&rec.category)
        .bind(&rec.from_unit)
        .bind(&rec.to_unit)
        .bind(rec.input_value)
        .bind(rec.result)
        .bind(rec.direction.map(|d| d.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;
        let id = done.last_insert_rowid();
        tracing::debug!(id, category = %rec.category, "history record saved");
        Ok(id)
    }

    /// The [`HISTORY_LIMIT`] newest records, newest first.
    pub async fn recent(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        self.latest(HISTORY_LIMIT).await
    }

    /// Newest `limit` records. Equal timestamps fall back to insertion order.
    pub async fn latest(&self, limit: i64) -> Result<Vec<HistoryRecord>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"SELECT id, "type", "fromUnit", "toUnit", "inputValue", result, direction, ts
               FROM history ORDER BY ts DESC, id DESC LIMIT ?"#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;
        rows.into_iter().map(HistoryRecord::try_from).collect()
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(n)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converters::Direction;

    fn record(input_value: f64) -> NewHistoryRecord {
        NewHistoryRecord {
            category: "length".into(),
            from_unit: "meter".into(),
            to_unit: "foot".into(),
            input_value,
            result: converters::round6(input_value * 3.28084),
            direction: Some(Direction::From),
        }
    }

    #[test]
    fn url_forms() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://"));
        assert!(is_memory_url(""));
        assert!(!is_memory_url("sqlite://history.db"));
        assert_eq!(sqlite_path_from_url("sqlite://history.db"), "history.db");
        assert_eq!(sqlite_path_from_url("sqlite:data/h.db"), "data/h.db");
        assert_eq!(sqlite_path_from_url("/tmp/h.db"), "/tmp/h.db");
    }

    #[tokio::test]
    async fn save_assigns_increasing_ids() {
        let store = HistoryStore::connect("sqlite::memory:").await.unwrap();
        let a = store.save(&record(1.0)).await.unwrap();
        let b = store.save(&record(1.0)).await.unwrap();
        assert!(b > a);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn saved_record_comes_back_first() {
        let store = HistoryStore::connect("sqlite::memory:").await.unwrap();
        store.save(&record(1.0)).await.unwrap();
        let id = store.save(&record(3.5)).await.unwrap();

        let history = store.recent().await.unwrap();
        assert_eq!(history.len(), 2);
        let first = &history[0];
        assert_eq!(first.id, id);
        assert_eq!(first.input_value, 3.5);
        assert_eq!(first.result, 11.48294);
        assert_eq!(first.direction.as_deref(), Some("from"));
        assert!(first.ts >= history[1].ts);
    }

    #[tokio::test]
    async fn recent_is_capped_and_newest_first() {
        let store = HistoryStore::connect("sqlite::memory:").await.unwrap();
        for i in 0..13 {
            store.save(&record(i as f64)).await.unwrap();
        }
        let history = store.recent().await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT as usize);
        assert_eq!(store.count().await.unwrap(), 13);
        let inputs: Vec<f64> = history.iter().map(|r| r.input_value).collect();
        assert_eq!(inputs, (3..13).rev().map(|i| i as f64).collect::<Vec<_>>());
        assert!(history.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn missing_direction_is_stored_as_null() {
        let store = HistoryStore::connect("sqlite::memory:").await.unwrap();
        let mut rec = record(2.0);
        rec.direction = None;
        store.save(&rec).await.unwrap();
        let history = store.recent().await.unwrap();
        assert_eq!(history[0].direction, None);
        let json = serde_json::to_value(&history[0]).unwrap();
        assert!(json.get("direction").is_none());
        assert_eq!(json["type"], "length");
        assert_eq!(json["fromUnit"], "meter");
        assert_eq!(json["inputValue"], 2.0);
    }

    #[tokio::test]
    async fn memory_stores_are_private() {
        let a = HistoryStore::connect("sqlite::memory:").await.unwrap();
        let b = HistoryStore::connect("sqlite::memory:").await.unwrap();
        a.save(&record(1.0)).await.unwrap();
        assert_eq!(b.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("history.db").display());
        let store = HistoryStore::connect(&url).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.save(&record(i as f64)).await })
            })
            .collect();
        let mut ids = Vec::with_capacity(handles.len());
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }

        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
        assert_eq!(store.count().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let url = format!("sqlite://{}", path.display());

        let store = HistoryStore::connect(&url).await.unwrap();
        store.save(&record(4.0)).await.unwrap();
        store.close().await;

        let reopened = HistoryStore::connect(&url).await.unwrap();
        let history = reopened.recent().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].input_value, 4.0);
    }
}
