//! Background execution of engine operations.
//!
//! The operation runs on its own worker thread; progress snapshots are
//! forwarded over a channel so the caller's thread can draw them without
//! stalling the copy loop.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

use super::{MigrationEngine, OperationOutcome};
use crate::errors::LedgerError;
use crate::fs_ops::{CancelToken, TransferProgress};
use crate::ledger::RecordId;
use crate::volumes::VolumeId;

/// A long-running engine request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Migrate { source: PathBuf, target: VolumeId },
    Restore(RecordId),
    Remigrate(RecordId),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Migrate { .. } => "migrate",
            Operation::Restore(_) => "restore",
            Operation::Remigrate(_) => "remigrate",
        }
    }
}

/// Handle to a running operation.
#[derive(Debug)]
pub struct OperationTask {
    cancel: CancelToken,
    progress: Receiver<TransferProgress>,
    handle: JoinHandle<Result<OperationOutcome, LedgerError>>,
}

impl OperationTask {
    /// Ask the worker to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the token, e.g. for a Ctrl-C handler.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Progress snapshots; the channel closes when the worker finishes.
    pub fn progress(&self) -> &Receiver<TransferProgress> {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the outcome. A panic on the worker is resumed here.
    pub fn join(self) -> Result<OperationOutcome, LedgerError> {
        match self.handle.join() {
            Ok(res) => res,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Start `op` on a worker thread.
pub fn spawn(engine: Arc<MigrationEngine>, op: Operation) -> io::Result<OperationTask> {
    let cancel = CancelToken::new();
    let (tx, rx) = mpsc::channel();
    let worker_cancel = cancel.clone();
    // Carry the caller's subscriber over to the worker.
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());

    let handle = thread::Builder::new()
        .name(format!("space-shift-{}", op.name()))
        .spawn(move || {
            tracing::dispatcher::with_default(&dispatch, || {
                let mut sink = |p: &TransferProgress| {
                    // The receiver may be gone; the operation carries on regardless.
                    let _ = tx.send(p.clone());
                };
                debug!(op = op.name(), "worker started");
                match op {
                    Operation::Migrate { source, target } => {
                        engine.migrate(&source, target, &mut sink, &worker_cancel)
                    }
                    Operation::Restore(id) => engine.restore(id, &mut sink, &worker_cancel),
                    Operation::Remigrate(id) => engine.remigrate(id, &mut sink, &worker_cancel),
                }
            })
        })?;

    Ok(OperationTask { cancel, progress: rx, handle })
}
