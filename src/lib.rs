//! Core library for `space_shift`.
//!
//! Relocates files and directory trees to another volume, leaves a symbolic
//! link at the original location and records every relocation in a ledger so
//! it can later be restored or re-applied.
//!
//! Layering, leaves first: [`validation`], [`volumes`], [`fs_ops`] (copier),
//! [`links`], [`ledger`], and the [`engine`] that orchestrates them.
//! The library emits `tracing` events only; installing a subscriber is the
//! caller's choice.

pub mod config;
pub mod engine;
pub mod errors;
pub mod fs_ops;
pub mod ledger;
pub mod links;
pub mod platform;
pub mod validation;
pub mod volumes;

pub use config::{Config, LogLevel};
pub use engine::task::{spawn, Operation, OperationTask};
pub use engine::{MigrationEngine, OperationOutcome};
pub use errors::{CopyError, LedgerError, LinkError, MigrationError, ValidationError};
pub use fs_ops::{calculate_size, CancelToken, Copier, NoProgress, ProgressSink, TransferProgress};
pub use ledger::{Ledger, MigrationRecord, MigrationStatus, RecordFilter, RecordId};
pub use links::{LinkKind, LinkManager, SystemLinks};
pub use validation::PathValidator;
pub use volumes::{format_bytes, SystemVolumes, VolumeCatalog, VolumeId, VolumeInfo, VolumeMount};
