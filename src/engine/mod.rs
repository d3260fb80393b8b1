//! Migration engine: Migrate, Restore and Remigrate.
//!
//! Each operation returns an [`OperationOutcome`]; only ledger faults escape
//! as `Err`. The physical sequence is always copy, then delete, then link,
//! and the ledger is written only after the filesystem change succeeded.
//!
//! Recovery rules:
//! - copy fails or is cancelled: the partial target is deleted, the source
//!   is untouched.
//! - deleting the source fails: the target is copied back over the source
//!   and deleted only if that copy-back succeeded.
//! - link creation fails: the target is copied back and deleted.
//! - restore has no rollback: a failed copy-back leaves the record Active.

mod lease;
pub mod target;
pub mod task;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, info_span, warn};

use crate::errors::{LedgerError, MigrationError};
use crate::fs_ops::{describe_io_error, CancelToken, Copier, NoProgress, ProgressSink};
use crate::ledger::{now_micros, Ledger, MigrationRecord, MigrationStatus, RecordFilter, RecordId};
use crate::links::{LinkKind, LinkManager, SystemLinks};
use crate::validation::PathValidator;
use crate::volumes::{path_is_under, remainder_after_root, SystemVolumes, VolumeCatalog, VolumeId, VolumeInfo};
use lease::{Lease, LeaseTable};
use target::moved_files_path;

/// Result of a long-running operation.
#[derive(Debug)]
pub enum OperationOutcome {
    Completed(MigrationRecord),
    Cancelled,
    Failed(MigrationError),
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationOutcome::Cancelled)
    }

    pub fn record(&self) -> Option<&MigrationRecord> {
        match self {
            OperationOutcome::Completed(r) => Some(r),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&MigrationError> {
        match self {
            OperationOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// One-line reason for anything but success.
    pub fn message(&self) -> Option<String> {
        match self {
            OperationOutcome::Completed(_) => None,
            OperationOutcome::Cancelled => Some(MigrationError::Cancelled.to_string()),
            OperationOutcome::Failed(e) => Some(e.to_string()),
        }
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationOutcome::Completed(r) => write!(
                f,
                "record {} {}: {} -> {}",
                r.id,
                r.status,
                r.source_path.display(),
                r.target_path.display()
            ),
            OperationOutcome::Cancelled => f.write_str("cancelled"),
            OperationOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Volumes and target path resolved for a migrate.
struct Plan {
    source_volume: VolumeId,
    target_volume: VolumeId,
    target_path: PathBuf,
}

pub struct MigrationEngine {
    ledger: Mutex<Ledger>,
    volumes: Arc<dyn VolumeCatalog>,
    links: Arc<dyn LinkManager>,
    copier: Copier,
    leases: LeaseTable,
}

impl fmt::Debug for MigrationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationEngine")
            .field("copier", &self.copier)
            .finish_non_exhaustive()
    }
}

fn io_err(op: &str, path: &Path, e: std::io::Error) -> MigrationError {
    MigrationError::Io(describe_io_error(op, path, &e))
}

/// True when `path` exists (following links) with the expected kind.
fn exists_as(path: &Path, is_dir: bool) -> bool {
    fs::metadata(path)
        .map(|m| if is_dir { m.is_dir() } else { m.is_file() })
        .unwrap_or(false)
}

fn finish(
    op: &'static str,
    result: Result<MigrationRecord, MigrationError>,
) -> Result<OperationOutcome, LedgerError> {
    match result {
        Ok(record) => {
            info!(op, id = record.id, src = %record.source_path.display(), dest = %record.target_path.display(), "operation completed");
            Ok(OperationOutcome::Completed(record))
        }
        Err(MigrationError::Cancelled) => {
            warn!(op, "operation cancelled");
            Ok(OperationOutcome::Cancelled)
        }
        Err(MigrationError::Ledger(e)) => {
            error!(op, error = %e, "ledger failure");
            Err(e)
        }
        Err(e) => {
            warn!(op, code = e.code(), kind = e.kind(), error = %e, "operation failed");
            Ok(OperationOutcome::Failed(e))
        }
    }
}

impl MigrationEngine {
    /// Engine over the running system's volumes and links.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            volumes: Arc::new(SystemVolumes::detect(&[])),
            links: Arc::new(SystemLinks),
            copier: Copier::default(),
            leases: LeaseTable::new(),
        }
    }

    pub fn with_volumes(mut self, volumes: Arc<dyn VolumeCatalog>) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn with_links(mut self, links: Arc<dyn LinkManager>) -> Self {
        self.links = links;
        self
    }

    pub fn with_copier(mut self, copier: Copier) -> Self {
        self.copier = copier;
        self
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, LedgerError> {
        self.ledger.lock().map_err(|_| LedgerError::Poisoned)
    }

    fn validator(&self) -> PathValidator {
        PathValidator::with_volume_roots(self.volumes.volumes().into_iter().map(|v| v.root))
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn volumes(&self) -> Vec<VolumeInfo> {
        self.volumes.volumes()
    }

    pub fn other_volumes(&self, exclude: VolumeId) -> Vec<VolumeInfo> {
        self.volumes.other_volumes(exclude)
    }

    /// Where `source` would be placed on `target`.
    pub fn target_path(&self, source: &Path, target: VolumeId) -> Result<PathBuf, MigrationError> {
        self.plan(source, target).map(|p| p.target_path)
    }

    fn plan(&self, source: &Path, target: VolumeId) -> Result<Plan, MigrationError> {
        let src_vol = self
            .volumes
            .volume_of(source)
            .ok_or_else(|| MigrationError::UnknownVolume(source.display().to_string()))?;
        let dst_vol = self
            .volumes
            .volume(target)
            .ok_or_else(|| MigrationError::UnknownVolume(target.to_string()))?;
        if src_vol.id == dst_vol.id {
            return Err(MigrationError::SameVolume(target));
        }
        let remainder = remainder_after_root(source, &src_vol.root);
        let target_path = moved_files_path(&dst_vol.root, src_vol.id, &remainder);
        // Nested volume roots (C=/, D=/mnt/data) can put the target under the source.
        if path_is_under(&target_path, source) || path_is_under(source, &target_path) {
            return Err(MigrationError::TargetInsideSource {
                path: source.to_path_buf(),
                target: target_path,
            });
        }
        Ok(Plan {
            source_volume: src_vol.id,
            target_volume: dst_vol.id,
            target_path,
        })
    }

    pub fn record(&self, id: RecordId) -> Result<Option<MigrationRecord>, LedgerError> {
        let mut rec = self.ledger()?.get(id)?;
        if let Some(r) = rec.as_mut() {
            r.is_valid = self.check_validity(r);
        }
        Ok(rec)
    }

    /// Records matching `filter`, newest first, each annotated with validity.
    pub fn records(&self, filter: &RecordFilter) -> Result<Vec<MigrationRecord>, LedgerError> {
        let mut records = self.ledger()?.list(filter)?;
        for r in &mut records {
            r.is_valid = self.check_validity(r);
        }
        Ok(records)
    }

    pub fn source_volumes(&self) -> Result<Vec<VolumeId>, LedgerError> {
        self.ledger()?.distinct_source_volumes()
    }

    pub fn target_volumes(&self) -> Result<Vec<VolumeId>, LedgerError> {
        self.ledger()?.distinct_target_volumes()
    }

    /// Forget a record. The filesystem is left as it is.
    pub fn delete_record(&self, id: RecordId) -> Result<bool, LedgerError> {
        let deleted = self.ledger()?.delete(id)?;
        if deleted {
            info!(id, "record deleted from ledger");
        }
        Ok(deleted)
    }

    /// Whether the filesystem agrees with the record's status. Never fails:
    /// anything that cannot be inspected counts as invalid.
    pub fn check_validity(&self, record: &MigrationRecord) -> bool {
        match record.status {
            MigrationStatus::Active => {
                self.links.is_link(&record.source_path).unwrap_or(false)
                    && exists_as(&record.target_path, record.is_directory)
            }
            MigrationStatus::Restored => exists_as(&record.source_path, record.is_directory),
        }
    }

    // ---------------------------------------------------------------------
    // Migrate
    // ---------------------------------------------------------------------

    /// Move `source` to `target` and leave a link behind.
    pub fn migrate(
        &self,
        source: &Path,
        target: VolumeId,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<OperationOutcome, LedgerError> {
        let span = info_span!("migrate", src = %source.display(), target = %target);
        let _enter = span.enter();
        finish("migrate", self.try_migrate(source, target, progress, cancel))
    }

    fn try_migrate(
        &self,
        source: &Path,
        target: VolumeId,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<MigrationRecord, MigrationError> {
        // Resolution errors are reported after validation so that a bad path
        // is rejected as such.
        let planned = self.plan(source, target);
        let mut lease_paths: Vec<&Path> = Vec::new();
        if source.is_absolute() {
            lease_paths.push(source);
            if let Ok(p) = &planned {
                lease_paths.push(p.target_path.as_path());
            }
        }
        let _lease = self.leases.try_acquire(&lease_paths).map_err(MigrationError::Busy)?;

        self.validator().validate(source)?;
        if self.links.is_link(source).map_err(|e| io_err("inspect", source, e))? {
            return Err(MigrationError::AlreadyLinked(source.to_path_buf()));
        }
        if self.links.is_in_use(source).map_err(|e| io_err("check in-use", source, e))? {
            return Err(MigrationError::InUse(source.to_path_buf()));
        }

        let plan = planned?;
        if fs::symlink_metadata(&plan.target_path).is_ok() {
            return Err(MigrationError::TargetExists(plan.target_path));
        }

        let size = self.copier.size_of(source)?;
        self.ensure_space(plan.target_volume, size, 0)?;

        let is_dir = fs::metadata(source)
            .map_err(|e| io_err("inspect", source, e))?
            .is_dir();
        info!(src = %source.display(), dest = %plan.target_path.display(), size, is_dir, "migrating");

        self.relocate(source, &plan.target_path, LinkKind::from_is_dir(is_dir), progress, cancel)?;

        let mut record = MigrationRecord::new_active(
            source.to_path_buf(),
            plan.target_path,
            plan.source_volume,
            plan.target_volume,
            size,
            is_dir,
        );
        let inserted = self.ledger()?.insert(&record);
        match inserted {
            Ok(id) => record.id = id,
            Err(e) => {
                error!(src = %record.source_path.display(), dest = %record.target_path.display(), error = %e,
                    "content was relocated but the ledger row could not be written");
                return Err(e.into());
            }
        }
        Ok(record)
    }

    /// Fail unless `volume` can take `required` bytes once `reclaimable`
    /// bytes already on it have been freed.
    fn ensure_space(&self, volume: VolumeId, required: u64, reclaimable: u64) -> Result<(), MigrationError> {
        let free = self
            .volumes
            .free_space(volume)
            .ok_or_else(|| MigrationError::UnknownVolume(volume.to_string()))?;
        let available = free.saturating_add(reclaimable);
        debug!(volume = %volume, required, free, reclaimable, "space check");
        if required > available {
            return Err(MigrationError::InsufficientSpace { volume, required, available });
        }
        Ok(())
    }

    /// Copy `source` to `target`, delete `source`, link `source` -> `target`.
    fn relocate(
        &self,
        source: &Path,
        target: &Path,
        kind: LinkKind,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(), MigrationError> {
        if let Err(e) = self.copier.copy(source, target, progress, cancel) {
            self.discard(target, "partial target");
            return Err(e.into());
        }

        if let Err(e) = self.copier.delete(source) {
            error!(src = %source.display(), error = %e, "deleting the source failed; copying content back");
            return Err(match self.copy_back(target, source) {
                Ok(()) => MigrationError::Io(format!("{e}; the source was restored from the copy")),
                Err(back) => MigrationError::Io(format!(
                    "{e}; copying back also failed ({back}); the complete copy is kept at {}",
                    target.display()
                )),
            });
        }

        if let Err(e) = self.links.create_link(source, target, kind) {
            error!(src = %source.display(), dest = %target.display(), error = %e, "link creation failed; copying content back");
            let reason = match self.copy_back(target, source) {
                Ok(()) => e.to_string(),
                Err(back) => format!(
                    "{e}; copying back failed ({back}); content is kept at {}",
                    target.display()
                ),
            };
            return Err(MigrationError::LinkCreation { reason });
        }
        Ok(())
    }

    /// Recovery copy of `from` over `to`, then delete `from`. `from` is kept
    /// when the copy fails.
    fn copy_back(&self, from: &Path, to: &Path) -> Result<(), MigrationError> {
        self.copier
            .copy(from, to, &mut NoProgress, &CancelToken::new())
            .map_err(MigrationError::from)?;
        self.discard(from, "recovered copy");
        Ok(())
    }

    fn discard(&self, path: &Path, what: &str) {
        match self.copier.delete(path) {
            Ok(()) => debug!(path = %path.display(), what, "removed"),
            Err(e) => warn!(path = %path.display(), what, error = %e, "cleanup failed"),
        }
    }

    /// Lease the paths of record `id`, then read the record again under the
    /// lease so the status checks and the physical steps see the same row.
    fn lease_record(&self, id: RecordId) -> Result<(Lease, MigrationRecord), MigrationError> {
        let seen = self.ledger()?.get(id)?.ok_or(MigrationError::NotFound(id))?;
        let lease = self
            .leases
            .try_acquire(&[seen.source_path.as_path(), seen.target_path.as_path()])
            .map_err(MigrationError::Busy)?;
        let record = self.ledger()?.get(id)?.ok_or(MigrationError::NotFound(id))?;
        Ok((lease, record))
    }

    // ---------------------------------------------------------------------
    // Restore
    // ---------------------------------------------------------------------

    /// Put the content of an Active record back at its source path.
    pub fn restore(
        &self,
        id: RecordId,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<OperationOutcome, LedgerError> {
        let span = info_span!("restore", id);
        let _enter = span.enter();
        finish("restore", self.try_restore(id, progress, cancel))
    }

    fn try_restore(
        &self,
        id: RecordId,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<MigrationRecord, MigrationError> {
        let (_lease, mut record) = self.lease_record(id)?;
        if record.status != MigrationStatus::Active {
            return Err(MigrationError::InvalidState {
                id,
                expected: MigrationStatus::Active.as_str(),
                actual: record.status.as_str(),
            });
        }

        self.links
            .remove_link(&record.source_path)
            .map_err(MigrationError::LinkRemoval)?;

        if let Err(e) = self
            .copier
            .copy(&record.target_path, &record.source_path, progress, cancel)
        {
            self.discard(&record.source_path, "partial restore");
            error!(id, src = %record.source_path.display(), dest = %record.target_path.display(), error = %e,
                "copy-back failed; link removed and record left Active, content remains at the target");
            return Err(e.into());
        }

        if let Err(e) = self.copier.delete(&record.target_path) {
            warn!(id, dest = %record.target_path.display(), error = %e, "restored, but the target copy could not be removed");
        }

        self.ledger()?.update_status(id, MigrationStatus::Restored)?;
        record.status = MigrationStatus::Restored;
        record.is_valid = self.check_validity(&record);
        Ok(record)
    }

    // ---------------------------------------------------------------------
    // Remigrate
    // ---------------------------------------------------------------------

    /// Move a Restored record's source back to its recorded target.
    pub fn remigrate(
        &self,
        id: RecordId,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<OperationOutcome, LedgerError> {
        let span = info_span!("remigrate", id);
        let _enter = span.enter();
        finish("remigrate", self.try_remigrate(id, progress, cancel))
    }

    fn try_remigrate(
        &self,
        id: RecordId,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<MigrationRecord, MigrationError> {
        let (_lease, mut record) = self.lease_record(id)?;
        if record.status != MigrationStatus::Restored {
            return Err(MigrationError::InvalidState {
                id,
                expected: MigrationStatus::Restored.as_str(),
                actual: record.status.as_str(),
            });
        }
        let source = record.source_path.clone();
        let target = record.target_path.clone();

        let meta = fs::symlink_metadata(&source).map_err(|_| MigrationError::SourceMissing(source.clone()))?;
        if meta.file_type().is_symlink() {
            return Err(MigrationError::AlreadyLinked(source));
        }
        if meta.is_dir() != record.is_directory {
            return Err(MigrationError::KindMismatch { path: source, expected: record.kind_str() });
        }
        if self.links.is_in_use(&source).map_err(|e| io_err("check in-use", &source, e))? {
            return Err(MigrationError::InUse(source));
        }

        let stale = fs::symlink_metadata(&target).is_ok();
        let reclaimable = if stale { self.copier.size_of(&target).unwrap_or(0) } else { 0 };
        let size = self.copier.size_of(&source)?;
        self.ensure_space(record.target_volume, size, reclaimable)?;

        if stale {
            warn!(id, dest = %target.display(), "removing stale copy left at the target");
            self.copier.delete(&target)?;
        }
        info!(src = %source.display(), dest = %target.display(), size, "remigrating");

        self.relocate(&source, &target, LinkKind::from_is_dir(record.is_directory), progress, cancel)?;

        let now = now_micros();
        self.ledger()?.mark_remigrated(id, now)?;
        record.status = MigrationStatus::Active;
        record.migrated_at = now;
        record.is_valid = self.check_validity(&record);
        Ok(record)
    }
}
