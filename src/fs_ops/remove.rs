//! Unconditional removal of files, links and directory trees.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::helpers::io_error_with_help;
use crate::errors::CopyError;
use crate::platform;

/// Remove `path` whatever it is. A missing path is not an error.
/// A link is removed without touching its target.
pub fn remove_path(path: &Path) -> Result<(), CopyError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_error_with_help("stat path to delete", path)(e)),
    };

    if meta.file_type().is_symlink() {
        return platform::remove_symlink(path).map_err(io_error_with_help("remove link", path));
    }

    if meta.is_dir() {
        match fs::remove_dir_all(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                debug!(path = %path.display(), "permission denied while deleting; relaxing permissions and retrying");
                make_tree_writable(path);
                fs::remove_dir_all(path).map_err(io_error_with_help("remove directory", path))?;
            }
            Err(e) => return Err(io_error_with_help("remove directory", path)(e)),
        }
    } else {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                let _ = platform::make_writable(path, &meta);
                fs::remove_file(path).map_err(io_error_with_help("remove file", path))?;
            }
            Err(e) => return Err(io_error_with_help("remove file", path)(e)),
        }
    }
    debug!(path = %path.display(), "deleted");
    Ok(())
}

fn make_tree_writable(root: &Path) {
    for entry in WalkDir::new(root).follow_links(false).into_iter().filter_map(Result::ok) {
        if entry.path_is_symlink() {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            if let Err(e) = platform::make_writable(entry.path(), &meta) {
                warn!(path = %entry.path().display(), error = %e, "cannot relax permissions");
            }
        }
    }
}
