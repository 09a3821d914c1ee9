use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use strongbox_core::types::{BackupMetadata, EncryptedPayload, StoredBackup};
use strongbox_core::{ArchiveError, Result};

use crate::provider::BackupStore;

/// SQLite-backed store. Metadata and payloads live in two tables keyed by
/// backup id and are written in one transaction. A single connection behind
/// a mutex serializes all access.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    name: String,
}

/// Run all migrations on the database.
fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA foreign_keys=ON;

        CREATE TABLE IF NOT EXISTS backup_metadata (
            id              TEXT PRIMARY KEY,
            timestamp       TEXT NOT NULL,
            size            INTEGER NOT NULL,
            encrypted       INTEGER NOT NULL,
            compressed      INTEGER NOT NULL,
            checksum        TEXT NOT NULL,
            version         TEXT NOT NULL,
            description     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_backup_metadata_timestamp
            ON backup_metadata(timestamp);

        CREATE TABLE IF NOT EXISTS backup_payloads (
            id              TEXT PRIMARY KEY REFERENCES backup_metadata(id) ON DELETE CASCADE,
            iv              BLOB NOT NULL,
            auth_tag        BLOB NOT NULL,
            ciphertext      BLOB NOT NULL
        );
        ",
    )?;
    Ok(())
}

const METADATA_COLUMNS: &str =
    "id, timestamp, size, encrypted, compressed, checksum, version, description";

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ArchiveError::Storage(format!("corrupt timestamp {raw:?}: {e}")))
}

struct MetadataRow {
    id: String,
    timestamp: String,
    size: i64,
    encrypted: bool,
    compressed: bool,
    checksum: String,
    version: String,
    description: Option<String>,
}

impl MetadataRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            size: row.get(2)?,
            encrypted: row.get(3)?,
            compressed: row.get(4)?,
            checksum: row.get(5)?,
            version: row.get(6)?,
            description: row.get(7)?,
        })
    }

    fn into_metadata(self) -> Result<BackupMetadata> {
        Ok(BackupMetadata {
            timestamp: decode_timestamp(&self.timestamp)?,
            id: self.id,
            size: self.size as u64,
            encrypted: self.encrypted,
            compressed: self.compressed,
            checksum: self.checksum,
            version: self.version,
            description: self.description,
        })
    }
}

impl SqliteStore {
    /// Open (or create) the database and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        migrate(&conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite backup store");
        Ok(Self {
            conn: Mutex::new(conn),
            name: format!("sqlite:{}", path.display()),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            name: "sqlite::memory:".to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ArchiveError::Storage("connection mutex poisoned".to_string()))
    }
}

#[async_trait]
impl BackupStore for SqliteStore {
    async fn put(&self, metadata: BackupMetadata, payload: EncryptedPayload) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM backup_metadata WHERE id=?1)",
            params![metadata.id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(ArchiveError::Storage(format!(
                "backup {} already exists",
                metadata.id
            )));
        }

        tx.execute(
            "INSERT INTO backup_metadata (id, timestamp, size, encrypted, compressed, checksum, version, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                metadata.id,
                encode_timestamp(&metadata.timestamp),
                metadata.size as i64,
                metadata.encrypted,
                metadata.compressed,
                metadata.checksum,
                metadata.version,
                metadata.description,
            ],
        )?;
        tx.execute(
            "INSERT INTO backup_payloads (id, iv, auth_tag, ciphertext) VALUES (?1, ?2, ?3, ?4)",
            params![
                metadata.id,
                &payload.iv[..],
                &payload.auth_tag[..],
                payload.ciphertext
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<StoredBackup> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {METADATA_COLUMNS} FROM backup_metadata WHERE id=?1"),
                params![id],
                MetadataRow::from_row,
            )
            .optional()?
            .ok_or_else(|| ArchiveError::NotFound(id.to_string()))?;

        let (iv, auth_tag, ciphertext): (Vec<u8>, Vec<u8>, Vec<u8>) = conn
            .query_row(
                "SELECT iv, auth_tag, ciphertext FROM backup_payloads WHERE id=?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .ok_or_else(|| ArchiveError::Storage(format!("payload missing for backup {id}")))?;

        let payload = EncryptedPayload {
            iv: iv
                .try_into()
                .map_err(|_| ArchiveError::Storage(format!("corrupt iv for backup {id}")))?,
            auth_tag: auth_tag
                .try_into()
                .map_err(|_| ArchiveError::Storage(format!("corrupt auth tag for backup {id}")))?,
            ciphertext,
        };

        Ok(StoredBackup {
            metadata: row.into_metadata()?,
            payload,
        })
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        // Payload row goes with it via ON DELETE CASCADE.
        let removed = conn.execute("DELETE FROM backup_metadata WHERE id=?1", params![id])?;
        tracing::trace!(id, removed, "sqlite delete");
        Ok(removed > 0)
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM backup_metadata WHERE id=?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn list(&self) -> Result<Vec<BackupMetadata>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {METADATA_COLUMNS} FROM backup_metadata ORDER BY timestamp DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([], MetadataRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(MetadataRow::into_metadata).collect()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
