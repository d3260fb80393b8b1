//! Migration record model.

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::volumes::VolumeId;

/// Ledger-assigned identity of a record.
pub type RecordId = i64;

/// Lifecycle state of a record; stored as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    /// Source is a link, content lives at the target.
    Active = 0,
    /// Content is back at the source.
    Restored = 1,
}

impl MigrationStatus {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(MigrationStatus::Active),
            1 => Some(MigrationStatus::Restored),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MigrationStatus::Active => "active",
            MigrationStatus::Restored => "restored",
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current time at the precision the ledger stores.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// One relocation and its current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationRecord {
    /// 0 until the ledger assigns an id on insert.
    pub id: RecordId,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub source_volume: VolumeId,
    pub target_volume: VolumeId,
    /// Bytes at migration time; not refreshed later.
    pub size: u64,
    pub is_directory: bool,
    /// Time of the latest migrate or remigrate.
    pub migrated_at: DateTime<Utc>,
    pub status: MigrationStatus,
    /// Physical state agrees with `status`. Computed on read, never stored.
    pub is_valid: bool,
}

impl MigrationRecord {
    /// A new, not yet persisted, active record.
    pub fn new_active(
        source_path: PathBuf,
        target_path: PathBuf,
        source_volume: VolumeId,
        target_volume: VolumeId,
        size: u64,
        is_directory: bool,
    ) -> Self {
        Self {
            id: 0,
            source_path,
            target_path,
            source_volume,
            target_volume,
            size,
            is_directory,
            migrated_at: now_micros(),
            status: MigrationStatus::Active,
            is_valid: true,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        if self.is_directory { "directory" } else { "file" }
    }
}

/// Optional volume filters for listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub source_volume: Option<VolumeId>,
    pub target_volume: Option<VolumeId>,
}

impl RecordFilter {
    pub fn source(mut self, v: VolumeId) -> Self {
        self.source_volume = Some(v);
        self
    }

    pub fn target(mut self, v: VolumeId) -> Self {
        self.target_volume = Some(v);
        self
    }
}
