use super::{RecordBackend, StoredRecord};
use crate::error::{LookupError, Result};
use crate::normalize::NormalizedNumber;
use crate::types::LookupPayload;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed durable tier. One row per sanitized `e164`; upserts keep the
/// original `created_at` and refresh `updated_at` on every write.
pub struct SqliteRecordBackend {
    conn: Mutex<Connection>,
}

impl SqliteRecordBackend {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path).map_err(sql_err)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS lookup_records (
                key        TEXT PRIMARY KEY,
                payload    TEXT NOT NULL,
                normalized TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn sql_err(err: rusqlite::Error) -> LookupError {
    LookupError::Storage(err.to_string())
}

#[async_trait]
impl RecordBackend for SqliteRecordBackend {
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT payload, normalized, created_at, updated_at
                 FROM lookup_records WHERE key = ?1",
            )
            .map_err(sql_err)?;
        let mut rows = stmt.query(params![key]).map_err(sql_err)?;
        if let Some(row) = rows.next().map_err(sql_err)? {
            let payload_json: String = row.get(0).map_err(sql_err)?;
            let normalized_json: String = row.get(1).map_err(sql_err)?;
            Ok(Some(StoredRecord {
                payload: serde_json::from_str(&payload_json)?,
                normalized: serde_json::from_str(&normalized_json)?,
                created_at: row.get(2).map_err(sql_err)?,
                updated_at: row.get(3).map_err(sql_err)?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn upsert(
        &self,
        key: &str,
        payload: &LookupPayload,
        normalized: &NormalizedNumber,
    ) -> Result<()> {
        let payload_json = serde_json::to_string(payload)?;
        let normalized_json = serde_json::to_string(normalized)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO lookup_records (key, payload, normalized, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(key) DO UPDATE SET
                 payload = excluded.payload,
                 normalized = excluded.normalized,
                 updated_at = excluded.updated_at",
            params![key, payload_json, normalized_json, now],
        )
        .map_err(sql_err)?;
        Ok(())
    }
}
