//! Filesystem operations: size, cancellable copy with progress, delete.

mod cancel;
mod helpers;
mod io_copy;
mod metadata;
pub(crate) mod progress;
mod remove;
mod size;
mod tree;

pub use cancel::CancelToken;
pub(crate) use helpers::describe_io_error;
pub use io_copy::DEFAULT_BUFFER_SIZE;
pub use progress::{NoProgress, ProgressSink, TransferProgress};
pub use remove::remove_path;
pub use size::calculate_size;

use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::CopyError;
use helpers::io_error_with_help;
use progress::ProgressTracker;

/// Copies files and directory trees with a fixed-size buffer.
#[derive(Debug, Clone, Copy)]
pub struct Copier {
    buf_size: usize,
}

impl Default for Copier {
    fn default() -> Self {
        Self { buf_size: DEFAULT_BUFFER_SIZE }
    }
}

impl Copier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom per-file buffer (a zero size is raised to one byte).
    pub fn with_buffer_size(buf_size: usize) -> Self {
        Self { buf_size: buf_size.max(1) }
    }

    pub fn buffer_size(&self) -> usize {
        self.buf_size
    }

    /// Recursive size of `path`, see [`calculate_size`].
    pub fn size_of(&self, path: &Path) -> Result<u64, CopyError> {
        calculate_size(path).map_err(|e| CopyError::Io { message: e.to_string(), source: e })
    }

    /// Copy `src` (file or directory) to `dst`, creating parent directories.
    /// Reports progress after every buffer write; returns the bytes written.
    /// On `Err` the destination may be partially written; callers delete it.
    pub fn copy(
        &self,
        src: &Path,
        dst: &Path,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<u64, CopyError> {
        let total = self.size_of(src)?;
        let meta = fs::symlink_metadata(src).map_err(io_error_with_help("stat source", src))?;
        debug!(src = %src.display(), dest = %dst.display(), total, "copy starting");

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(io_error_with_help("create directory", parent))?;
        }

        let mut tracker = ProgressTracker::new(total, sink);
        if meta.is_dir() {
            tree::copy_tree(src, dst, self.buf_size, &mut tracker, cancel)?;
        } else {
            cancel.checkpoint()?;
            tree::copy_leaf(src, dst, self.buf_size, &mut tracker)?;
        }
        let copied = tracker.copied();
        info!(src = %src.display(), dest = %dst.display(), bytes = copied, "copy finished");
        Ok(copied)
    }

    /// Unconditionally remove a file, link or directory tree.
    pub fn delete(&self, path: &Path) -> Result<(), CopyError> {
        remove_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copy_creates_missing_parents() {
        let td = tempdir().unwrap();
        let src = td.path().join("a.txt");
        fs::write(&src, b"abc").unwrap();
        let dst = td.path().join("deep/er/a.txt");
        let n = Copier::new().copy(&src, &dst, &mut NoProgress, &CancelToken::new()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(fs::read(&dst).unwrap(), b"abc");
    }

    #[test]
    fn empty_directory_copies_with_zero_bytes() {
        let td = tempdir().unwrap();
        let src = td.path().join("empty");
        fs::create_dir(&src).unwrap();
        let dst = td.path().join("out");
        let mut reports = 0;
        let mut sink = |_: &TransferProgress| reports += 1;
        let n = Copier::new().copy(&src, &dst, &mut sink, &CancelToken::new()).unwrap();
        assert_eq!(n, 0);
        assert_eq!(reports, 0);
        assert!(dst.is_dir());
    }

    #[test]
    fn zero_buffer_is_raised() {
        assert_eq!(Copier::with_buffer_size(0).buffer_size(), 1);
    }
}
