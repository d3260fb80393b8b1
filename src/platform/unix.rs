//! Unix implementations of platform helpers.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use super::temp::staging_path;

/// Create a symbolic link at `link` pointing to `target`.
/// Unix links carry no file/directory kind and need no privilege, so a
/// single attempt is made.
pub fn create_symlink(target: &Path, link: &Path, _is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Remove the link itself (never its target).
pub fn remove_symlink(link: &Path) -> io::Result<()> {
    fs::remove_file(link)
}

/// Unix has no "system" attribute.
pub fn is_system_item(_meta: &fs::Metadata) -> bool {
    false
}

/// Best-effort probe: true when another open file description holds an
/// exclusive advisory lock (flock) on `path`. Processes that write without
/// locking are invisible to this check.
pub fn is_locked_by_other(path: &Path) -> io::Result<bool> {
    let f = File::open(path)?;
    match f.try_lock_exclusive() {
        Ok(()) => {
            let _ = f.unlock();
            Ok(false)
        }
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(true),
        Err(e) => Err(e),
    }
}

/// Give the owner write/search access to a directory so its entries can be
/// removed. Files need nothing: unlinking depends on the parent directory.
pub fn make_writable(path: &Path, meta: &fs::Metadata) -> io::Result<()> {
    if meta.is_dir() {
        let mode = meta.permissions().mode() | 0o700;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    Ok(())
}

/// Append handle for the log file. A file created here is 0600; an existing
/// file keeps whatever mode an administrator gave it.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).mode(0o600).open(path)
}

/// Create `path` with owner-only permissions, or fail if it exists.
///
/// Contents go to a 0600 staging file that is synced, renamed over `path`
/// and followed by a sync of the directory so the rename is durable. The
/// parent directory is created 0700 when missing.
pub fn write_private_file_new(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent).with_context(|| format!("create directory '{}'", parent.display()))?;
        fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
            .with_context(|| format!("restrict directory '{}'", parent.display()))?;
    }
    if fs::symlink_metadata(path).is_ok() {
        bail!("refusing to replace existing file '{}'", path.display());
    }

    let staged = staging_path(path);
    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(&staged)
        .and_then(|mut f| {
            f.write_all(contents)?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&staged, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&staged);
        return Err(e).with_context(|| format!("write '{}'", path.display()));
    }

    File::open(parent)
        .and_then(|d| d.sync_all())
        .with_context(|| format!("sync directory '{}'", parent.display()))
}
