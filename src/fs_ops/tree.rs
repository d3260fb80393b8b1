//! Recursive directory copy.
//! Files of a directory are copied before its subdirectories, each behind a
//! cancellation checkpoint. Directory metadata is applied post-order so that
//! writing children does not disturb it. Nested links are recreated as links
//! and never followed.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::helpers::io_error_with_help;
use super::io_copy::copy_file_with_progress;
use super::metadata::preserve_metadata;
use super::progress::ProgressTracker;
use super::remove::remove_path;
use super::CancelToken;
use crate::errors::CopyError;
use crate::platform;

/// Copy the directory `src` into `dst` (created if missing).
pub(super) fn copy_tree(
    src: &Path,
    dst: &Path,
    buf_size: usize,
    tracker: &mut ProgressTracker<'_>,
    cancel: &CancelToken,
) -> Result<(), CopyError> {
    let src_meta = fs::metadata(src).map_err(io_error_with_help("stat source directory", src))?;
    fs::create_dir_all(dst).map_err(io_error_with_help("create directory", dst))?;

    let (files, dirs) = split_entries(src)?;

    for path in files {
        cancel.checkpoint()?;
        let Some(name) = path.file_name() else { continue };
        let dest = dst.join(name);
        copy_leaf(&path, &dest, buf_size, tracker)?;
    }

    for path in dirs {
        cancel.checkpoint()?;
        let Some(name) = path.file_name() else { continue };
        copy_tree(&path, &dst.join(name), buf_size, tracker, cancel)?;
    }

    preserve_metadata(src, dst, &src_meta);
    trace!(src = %src.display(), dest = %dst.display(), "directory copied");
    Ok(())
}

/// Copy one non-directory entry: a link is recreated, a file is streamed.
pub(super) fn copy_leaf(
    src: &Path,
    dst: &Path,
    buf_size: usize,
    tracker: &mut ProgressTracker<'_>,
) -> Result<(), CopyError> {
    let meta = fs::symlink_metadata(src).map_err(io_error_with_help("stat source", src))?;
    if meta.file_type().is_symlink() {
        return copy_link(src, dst);
    }
    copy_file_with_progress(src, dst, buf_size, tracker)?;
    preserve_metadata(src, dst, &meta);
    Ok(())
}

fn copy_link(src: &Path, dst: &Path) -> Result<(), CopyError> {
    let target = fs::read_link(src).map_err(io_error_with_help("read link", src))?;
    // A dangling link has no kind to inspect; file semantics then.
    let is_dir = fs::metadata(src).map(|m| m.is_dir()).unwrap_or(false);
    remove_path(dst)?;
    platform::create_symlink(&target, dst, is_dir)
        .map_err(io_error_with_help("recreate link", dst))?;
    debug!(src = %src.display(), dest = %dst.display(), link_target = %target.display(), "recreated nested link");
    Ok(())
}

/// Directory entries split into (non-directories, directories), each sorted
/// by name for a stable copy order. Links to directories count as files.
fn split_entries(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), CopyError> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let rd = fs::read_dir(dir).map_err(io_error_with_help("read directory", dir))?;
    for entry in rd {
        let entry = entry.map_err(io_error_with_help("read directory entry", dir))?;
        let path = entry.path();
        let ft = entry
            .file_type()
            .map_err(io_error_with_help("stat directory entry", &path))?;
        if ft.is_dir() {
            dirs.push(path);
        } else {
            files.push(path);
        }
    }
    files.sort();
    dirs.sort();
    Ok((files, dirs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_ops::progress::TransferProgress;
    use tempfile::tempdir;

    #[test]
    fn files_before_subdirectories() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        fs::create_dir_all(src.join("a_sub")).unwrap();
        fs::write(src.join("a_sub/inner.txt"), b"inner").unwrap();
        fs::write(src.join("z_top.txt"), b"top").unwrap();

        let mut order = Vec::new();
        let mut sink = |p: &TransferProgress| order.push(p.current_file.clone());
        let mut tracker = ProgressTracker::new(8, &mut sink);
        copy_tree(&src, &td.path().join("dst"), 1024, &mut tracker, &CancelToken::new()).unwrap();
        drop(tracker);

        assert_eq!(order, vec!["z_top.txt".to_string(), "inner.txt".to_string()]);
        assert_eq!(fs::read(td.path().join("dst/a_sub/inner.txt")).unwrap(), b"inner");
    }

    #[test]
    fn cancelled_token_stops_before_first_file() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("f.txt"), b"data").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let mut sink = crate::fs_ops::NoProgress;
        let mut tracker = ProgressTracker::new(4, &mut sink);
        let err = copy_tree(&src, &td.path().join("dst"), 1024, &mut tracker, &cancel).unwrap_err();
        assert!(matches!(err, CopyError::Cancelled));
        assert!(!td.path().join("dst/f.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn nested_links_are_recreated_not_followed() {
        let td = tempdir().unwrap();
        let outside = td.path().join("outside.txt");
        fs::write(&outside, b"not copied").unwrap();
        let src = td.path().join("src");
        fs::create_dir_all(&src).unwrap();
        std::os::unix::fs::symlink(&outside, src.join("ln")).unwrap();

        let mut sink = crate::fs_ops::NoProgress;
        let mut tracker = ProgressTracker::new(0, &mut sink);
        let dst = td.path().join("dst");
        copy_tree(&src, &dst, 1024, &mut tracker, &CancelToken::new()).unwrap();
        assert_eq!(tracker.copied(), 0);

        let meta = fs::symlink_metadata(dst.join("ln")).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read_link(dst.join("ln")).unwrap(), outside);
    }
}
