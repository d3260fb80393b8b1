//! In-process path leases.
//! An operation holds a lease over every path it touches; a second operation
//! on an equal, ancestor or descendant path is refused instead of waiting.
//! The lease is released when the guard is dropped, on every exit path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

use crate::volumes::path_is_under;

#[derive(Debug, Clone, Default)]
pub(crate) struct LeaseTable {
    held: Arc<Mutex<HashSet<PathBuf>>>,
}

/// RAII guard for a set of leased paths.
#[derive(Debug)]
pub(crate) struct Lease {
    held: Arc<Mutex<HashSet<PathBuf>>>,
    paths: Vec<PathBuf>,
}

fn lock(held: &Mutex<HashSet<PathBuf>>) -> MutexGuard<'_, HashSet<PathBuf>> {
    // The set stays consistent even if a holder panicked mid-operation.
    held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn overlaps(a: &Path, b: &Path) -> bool {
    path_is_under(a, b) || path_is_under(b, a)
}

impl LeaseTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Lease all `paths` at once, or none of them. Returns `Err` with the
    /// first requested path that overlaps a lease already held.
    pub(crate) fn try_acquire(&self, paths: &[&Path]) -> Result<Lease, PathBuf> {
        let mut held = lock(&self.held);
        for p in paths {
            if held.iter().any(|h| overlaps(h, p)) {
                trace!(path = %p.display(), "lease conflict");
                return Err(p.to_path_buf());
            }
        }
        let paths: Vec<PathBuf> = paths.iter().map(|p| p.to_path_buf()).collect();
        for p in &paths {
            held.insert(p.clone());
        }
        trace!(count = paths.len(), "lease acquired");
        Ok(Lease { held: Arc::clone(&self.held), paths })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.held).len()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut held = lock(&self.held);
        for p in &self.paths {
            held.remove(p);
        }
    }
}
