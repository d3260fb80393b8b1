//! Typed error definitions for space_shift.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::path::PathBuf;
use thiserror::Error;

use crate::ledger::RecordId;
use crate::volumes::VolumeId;

/// Reasons a path is refused by the path validator, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Path must not be empty")]
    Empty,

    #[error("Path is not valid Unicode and cannot be recorded: {0}")]
    NotUnicode(PathBuf),

    #[error("Path must be absolute: {0}")]
    NotAbsolute(PathBuf),

    #[error("Path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("Refusing to move a system item: {0}")]
    SystemItem(PathBuf),

    #[error("Refusing to move a protected system location ({marker}): {path}")]
    ProtectedLocation { path: PathBuf, marker: String },

    #[error("Refusing to move a critical system file ({name}): {path}")]
    CriticalFile { path: PathBuf, name: String },

    #[error("Refusing to move a volume root: {0}")]
    VolumeRoot(PathBuf),
}

/// Failure of a single copy run.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Copy cancelled")]
    Cancelled,

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to create or remove a filesystem link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Cannot create link '{link}' -> '{target}': {source}")]
    Create {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a link, refusing to remove: {0}")]
    NotALink(PathBuf),

    #[error("Cannot remove link '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of the durable ledger. These are the only engine faults that
/// propagate as hard errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot prepare ledger location '{path}': {source}")]
    Location {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt ledger row {id}: {reason}")]
    CorruptRow { id: RecordId, reason: String },

    #[error("Ledger lock poisoned")]
    Poisoned,
}

/// Everything that can make a migrate/restore/remigrate fail.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Path is already a symbolic link; nothing to migrate: {0}")]
    AlreadyLinked(PathBuf),

    #[error("Path is in use by another process; close the application using it and retry: {0}")]
    InUse(PathBuf),

    #[error("Insufficient space on volume {volume}: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        volume: VolumeId,
        required: u64,
        available: u64,
    },

    #[error("Unknown volume: {0}")]
    UnknownVolume(String),

    #[error("Source and target volume are the same ({0})")]
    SameVolume(VolumeId),

    #[error("Target path already exists; refusing to overwrite: {0}")]
    TargetExists(PathBuf),

    #[error("Target '{target}' would lie inside the source '{path}' (or contain it)")]
    TargetInsideSource { path: PathBuf, target: PathBuf },

    #[error("Creating the symbolic link failed (try running with elevated privileges): {reason}")]
    LinkCreation { reason: String },

    #[error("Cannot remove the link at the source: {0}")]
    LinkRemoval(#[source] LinkError),

    #[error("No migration record with id {0}")]
    NotFound(RecordId),

    #[error("Record {id} is {actual}; this operation needs a {expected} record")]
    InvalidState {
        id: RecordId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Source path does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("Source kind changed since migration (expected a {expected}): {path}")]
    KindMismatch { path: PathBuf, expected: &'static str },

    #[error("Another operation is already running on an overlapping path: {0}")]
    Busy(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Io(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl MigrationError {
    /// Stable numeric code for structured logs and exit statuses.
    pub fn code(&self) -> i32 {
        match self {
            MigrationError::Validation(_) => 10,
            MigrationError::AlreadyLinked(_) => 11,
            MigrationError::InUse(_) => 12,
            MigrationError::InsufficientSpace { .. } => 13,
            MigrationError::UnknownVolume(_) => 14,
            MigrationError::SameVolume(_) => 15,
            MigrationError::TargetExists(_) => 16,
            MigrationError::TargetInsideSource { .. } => 17,
            MigrationError::LinkCreation { .. } => 20,
            MigrationError::LinkRemoval(_) => 21,
            MigrationError::NotFound(_) => 30,
            MigrationError::InvalidState { .. } => 31,
            MigrationError::SourceMissing(_) => 32,
            MigrationError::KindMismatch { .. } => 33,
            MigrationError::Busy(_) => 40,
            MigrationError::Cancelled => 130,
            MigrationError::Io(_) => 74,
            MigrationError::Ledger(_) => 70,
        }
    }

    /// Short machine-friendly label, used as the `kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationError::Validation(_) => "validation",
            MigrationError::AlreadyLinked(_) => "already_linked",
            MigrationError::InUse(_) => "in_use",
            MigrationError::InsufficientSpace { .. } => "insufficient_space",
            MigrationError::UnknownVolume(_) => "unknown_volume",
            MigrationError::SameVolume(_) => "same_volume",
            MigrationError::TargetExists(_) => "target_exists",
            MigrationError::TargetInsideSource { .. } => "target_inside_source",
            MigrationError::LinkCreation { .. } => "link_creation",
            MigrationError::LinkRemoval(_) => "link_removal",
            MigrationError::NotFound(_) => "not_found",
            MigrationError::InvalidState { .. } => "invalid_state",
            MigrationError::SourceMissing(_) => "source_missing",
            MigrationError::KindMismatch { .. } => "kind_mismatch",
            MigrationError::Busy(_) => "busy",
            MigrationError::Cancelled => "cancelled",
            MigrationError::Io(_) => "io",
            MigrationError::Ledger(_) => "ledger",
        }
    }
}

impl From<CopyError> for MigrationError {
    fn from(e: CopyError) -> Self {
        match e {
            CopyError::Cancelled => MigrationError::Cancelled,
            CopyError::Io { message, .. } => MigrationError::Io(message),
        }
    }
}
