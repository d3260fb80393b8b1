//! Windows implementations of platform helpers (best-effort, minimal ACL awareness).
//!
//! Notes:
//! - Windows lacks POSIX mode semantics; we do not attempt ACL management here.
//! - Symbolic links need either Developer Mode (unprivileged creation) or an
//!   elevated process.
//! - Config writes are done via temp + rename to be atomic.

use anyhow::{bail, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::fs::{FileTypeExt, MetadataExt, OpenOptionsExt};
use std::path::Path;
use windows_sys::Win32::Storage::FileSystem::{
    CreateSymbolicLinkW, FILE_ATTRIBUTE_SYSTEM, SYMBOLIC_LINK_FLAG_ALLOW_UNPRIVILEGED_CREATE,
    SYMBOLIC_LINK_FLAG_DIRECTORY,
};

use super::temp::staging_path;

const ERROR_SHARING_VIOLATION: i32 = 32;
const ERROR_LOCK_VIOLATION: i32 = 33;

fn wide(p: &Path) -> Vec<u16> {
    p.as_os_str().encode_wide().chain(once(0)).collect()
}

fn raw_create_symlink(target: &Path, link: &Path, flags: u32) -> io::Result<()> {
    let link_w = wide(link);
    let target_w = wide(target);
    // The binding returns BOOLEAN; `as u8` keeps this independent of its exact type.
    let rc = unsafe { CreateSymbolicLinkW(link_w.as_ptr(), target_w.as_ptr(), flags) } as u8;
    if rc == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Create a symbolic link at `link` pointing to `target`.
/// First attempt: unprivileged creation (Developer Mode); fallback: the
/// classic privileged call. Fails only when both attempts fail.
pub fn create_symlink(target: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
    let kind = if is_dir { SYMBOLIC_LINK_FLAG_DIRECTORY } else { 0 };
    match raw_create_symlink(target, link, kind | SYMBOLIC_LINK_FLAG_ALLOW_UNPRIVILEGED_CREATE) {
        Ok(()) => Ok(()),
        Err(first) => {
            tracing::debug!(link = %link.display(), error = %first, "unprivileged link creation failed; retrying privileged");
            raw_create_symlink(target, link, kind)
        }
    }
}

/// Remove the link itself (never its target). Directory links are removed
/// as directories, file links as files.
pub fn remove_symlink(link: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(link)?;
    if meta.file_type().is_symlink_dir() {
        fs::remove_dir(link)
    } else {
        fs::remove_file(link)
    }
}

/// True when the item carries FILE_ATTRIBUTE_SYSTEM.
pub fn is_system_item(meta: &fs::Metadata) -> bool {
    meta.file_attributes() & FILE_ATTRIBUTE_SYSTEM != 0
}

/// Best-effort probe: open without any sharing; a sharing or lock violation
/// means another process holds the file open.
pub fn is_locked_by_other(path: &Path) -> io::Result<bool> {
    match OpenOptions::new().read(true).share_mode(0).open(path) {
        Ok(_) => Ok(false),
        Err(e) => match e.raw_os_error() {
            Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION) => Ok(true),
            _ => Err(e),
        },
    }
}

/// Clear the readonly attribute so the entry can be deleted.
pub fn make_writable(path: &Path, meta: &fs::Metadata) -> io::Result<()> {
    let mut perms = meta.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Open log file for appending (best-effort; no symlink defense available via std on Windows).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Create `path` through a staging file and rename, or fail if it exists.
/// Permissions are inherited from the directory ACL.
pub fn write_private_file_new(path: &Path, contents: &[u8]) -> Result<()> {
    if fs::symlink_metadata(path).is_ok() {
        bail!("refusing to replace existing file '{}'", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let staged = staging_path(path);
    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
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
    Ok(())
}
