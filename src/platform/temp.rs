//! Staging names for files that are written next to their final location
//! and renamed into place.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `target`: `.<name>.<pid>-<seq>.partial`.
/// Unique within the process; the pid separates concurrent processes.
pub(super) fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "space_shift".into());
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let staged = format!(".{name}.{}-{seq}.partial", std::process::id());
    match target.parent() {
        Some(dir) => dir.join(staged),
        None => PathBuf::from(staged),
    }
}
