//! Durable store of migration records (SQLite).
//!
//! Only `status`, and `migrated_at` together with it on remigrate, change
//! after insert. Deleting a row never touches the filesystem.

mod record;
mod schema;

pub use record::{now_micros, MigrationRecord, MigrationStatus, RecordFilter, RecordId};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::LedgerError;
use crate::volumes::VolumeId;
use schema::{CREATE_SCHEMA_SQL, SELECT_COLUMNS};

pub struct Ledger {
    conn: Connection,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").field("path", &self.conn.path()).finish()
    }
}

/// Column values as stored, before conversion.
struct RawRow {
    id: i64,
    source_path: String,
    target_path: String,
    source_volume: String,
    target_volume: String,
    size: i64,
    is_directory: bool,
    migrated_at: String,
    status: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_path: row.get(1)?,
            target_path: row.get(2)?,
            source_volume: row.get(3)?,
            target_volume: row.get(4)?,
            size: row.get(5)?,
            is_directory: row.get(6)?,
            migrated_at: row.get(7)?,
            status: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<MigrationRecord, LedgerError> {
        let id = self.id;
        let corrupt = |reason: String| LedgerError::CorruptRow { id, reason };
        let source_volume: VolumeId = self
            .source_volume
            .parse()
            .map_err(|e| corrupt(format!("source_volume: {e}")))?;
        let target_volume: VolumeId = self
            .target_volume
            .parse()
            .map_err(|e| corrupt(format!("target_volume: {e}")))?;
        let migrated_at = DateTime::parse_from_rfc3339(&self.migrated_at)
            .map_err(|e| corrupt(format!("migrated_at '{}': {e}", self.migrated_at)))?
            .with_timezone(&Utc);
        let status = MigrationStatus::from_i64(self.status)
            .ok_or_else(|| corrupt(format!("unknown status {}", self.status)))?;
        let size = u64::try_from(self.size).map_err(|_| corrupt(format!("negative size {}", self.size)))?;
        Ok(MigrationRecord {
            id,
            source_path: PathBuf::from(self.source_path),
            target_path: PathBuf::from(self.target_path),
            source_volume,
            target_volume,
            size,
            is_directory: self.is_directory,
            migrated_at,
            status,
            is_valid: true,
        })
    }
}

/// Fixed-width UTC text so that lexical order equals time order.
fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn path_text(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

impl Ledger {
    /// Open (creating if needed) the ledger database at `path`.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LedgerError::Location {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        let ledger = Self::init(conn)?;
        info!(path = %path.display(), "ledger opened");
        Ok(ledger)
    }

    /// Volatile ledger, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute_batch(CREATE_SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Persist `record`; returns the assigned id.
    pub fn insert(&self, record: &MigrationRecord) -> Result<RecordId, LedgerError> {
        let size = i64::try_from(record.size).unwrap_or(i64::MAX);
        self.conn.execute(
            "INSERT INTO migration_records \
             (source_path, target_path, source_volume, target_volume, size, is_directory, migrated_at, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                path_text(&record.source_path),
                path_text(&record.target_path),
                record.source_volume.to_string(),
                record.target_volume.to_string(),
                size,
                record.is_directory,
                timestamp_text(record.migrated_at),
                record.status.as_i64(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, source = %record.source_path.display(), "ledger row inserted");
        Ok(id)
    }

    /// Set the status of `id`. Returns false when no such row exists.
    pub fn update_status(&self, id: RecordId, status: MigrationStatus) -> Result<bool, LedgerError> {
        let n = self.conn.execute(
            "UPDATE migration_records SET status = ?1 WHERE id = ?2",
            params![status.as_i64(), id],
        )?;
        debug!(id, status = %status, updated = n, "ledger status updated");
        Ok(n > 0)
    }

    /// Flip `id` back to Active and stamp the remigration time.
    pub fn mark_remigrated(&self, id: RecordId, at: DateTime<Utc>) -> Result<bool, LedgerError> {
        let n = self.conn.execute(
            "UPDATE migration_records SET status = ?1, migrated_at = ?2 WHERE id = ?3",
            params![MigrationStatus::Active.as_i64(), timestamp_text(at), id],
        )?;
        debug!(id, updated = n, "ledger row remigrated");
        Ok(n > 0)
    }

    pub fn get(&self, id: RecordId) -> Result<Option<MigrationRecord>, LedgerError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM migration_records WHERE id = ?1");
        let raw = self
            .conn
            .query_row(&sql, params![id], RawRow::from_row)
            .optional()?;
        raw.map(RawRow::into_record).transpose()
    }

    /// Records matching `filter`, most recently migrated first.
    pub fn list(&self, filter: &RecordFilter) -> Result<Vec<MigrationRecord>, LedgerError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM migration_records \
             WHERE (?1 IS NULL OR source_volume = ?1) AND (?2 IS NULL OR target_volume = ?2) \
             ORDER BY migrated_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                filter.source_volume.map(|v| v.to_string()),
                filter.target_volume.map(|v| v.to_string()),
            ],
            RawRow::from_row,
        )?;
        let mut out = Vec::new();
        for raw in rows {
            out.push(raw?.into_record()?);
        }
        Ok(out)
    }

    pub fn distinct_source_volumes(&self) -> Result<Vec<VolumeId>, LedgerError> {
        self.distinct_volumes("source_volume")
    }

    pub fn distinct_target_volumes(&self) -> Result<Vec<VolumeId>, LedgerError> {
        self.distinct_volumes("target_volume")
    }

    fn distinct_volumes(&self, column: &'static str) -> Result<Vec<VolumeId>, LedgerError> {
        let sql = format!("SELECT DISTINCT {column} FROM migration_records ORDER BY {column} ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for v in rows {
            let v = v?;
            let id = v.parse().map_err(|e| LedgerError::CorruptRow {
                id: 0,
                reason: format!("{column} '{v}': {e}"),
            })?;
            out.push(id);
        }
        Ok(out)
    }

    /// Remove the row only. Returns false when no such row exists.
    pub fn delete(&self, id: RecordId) -> Result<bool, LedgerError> {
        let n = self
            .conn
            .execute("DELETE FROM migration_records WHERE id = ?1", params![id])?;
        debug!(id, deleted = n, "ledger row deleted");
        Ok(n > 0)
    }
}
