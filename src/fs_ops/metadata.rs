//! Metadata preservation.
//! - Copies timestamps (atime, mtime) and permissions from source -> dest.
//! - Windows: also copies the creation time and file attributes.
//! - With the "xattrs" feature, extended attributes are copied too.
//! - Best-effort: failures are logged and ignored; a copied file with slightly
//!   different metadata is still a correct copy.

use filetime::{set_file_times, FileTime};
use std::fs;
use std::path::Path;
use tracing::{trace, warn};

/// Preserve metadata on `dest` using already-fetched `src_meta`.
/// Call after the content of `dest` is final (for directories: after all
/// children were copied, otherwise writing children bumps the mtime again).
pub(super) fn preserve_metadata(src: &Path, dest: &Path, src_meta: &fs::Metadata) {
    preserve_xattrs(src, dest);

    // Timestamps
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let mt = FileTime::from_unix_time(src_meta.mtime(), src_meta.mtime_nsec() as u32);
        let at = FileTime::from_unix_time(src_meta.atime(), src_meta.atime_nsec() as u32);
        if let Err(e) = set_file_times(dest, at, mt) {
            warn!(path = %dest.display(), error = %e, "failed to set atime/mtime on destination");
        } else {
            trace!(path = %dest.display(), "set atime/mtime on destination");
        }
    }
    #[cfg(not(unix))]
    {
        let at = src_meta.accessed().ok().map(FileTime::from_system_time);
        let mt = src_meta.modified().ok().map(FileTime::from_system_time);
        if let (Some(a), Some(m)) = (at, mt) {
            if let Err(e) = set_file_times(dest, a, m) {
                warn!(path = %dest.display(), error = %e, "failed to set atime/mtime on destination");
            } else {
                trace!(path = %dest.display(), "set atime/mtime on destination");
            }
        }
    }

    // Attributes and permissions last: a read-only bit must not block the steps above.
    #[cfg(windows)]
    preserve_windows_times_and_attributes(dest, src_meta);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let src_mode = src_meta.permissions().mode() & 0o7777;
        if let Err(e) = fs::set_permissions(dest, fs::Permissions::from_mode(src_mode)) {
            warn!(path = %dest.display(), mode = format!("{:o}", src_mode), error = %e, "failed to set permissions on destination");
        } else {
            trace!(path = %dest.display(), mode = format!("{:o}", src_mode), "set permissions on destination");
        }
    }
}

/// Creation time and attribute bits (readonly, hidden, archive, ...).
#[cfg(windows)]
fn preserve_windows_times_and_attributes(dest: &Path, src_meta: &fs::Metadata) {
    use std::fs::{FileTimes, OpenOptions};
    use std::os::windows::ffi::OsStrExt;
    use std::os::windows::fs::{FileTimesExt, MetadataExt, OpenOptionsExt};
    use windows_sys::Win32::Storage::FileSystem::{
        SetFileAttributesW, FILE_ATTRIBUTE_DIRECTORY, FILE_FLAG_BACKUP_SEMANTICS,
    };

    if let Ok(created) = src_meta.created() {
        // Directories can only be opened with backup semantics.
        let opened = OpenOptions::new()
            .write(true)
            .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
            .open(dest);
        match opened {
            Ok(f) => {
                if let Err(e) = f.set_times(FileTimes::new().set_created(created)) {
                    warn!(path = %dest.display(), error = %e, "failed to set creation time on destination");
                }
            }
            Err(e) => warn!(path = %dest.display(), error = %e, "failed to open destination for creation time"),
        }
    }

    let attrs = src_meta.file_attributes() & !FILE_ATTRIBUTE_DIRECTORY;
    let wide: Vec<u16> = dest.as_os_str().encode_wide().chain(std::iter::once(0)).collect();
    let ok = unsafe { SetFileAttributesW(wide.as_ptr(), attrs) };
    if ok == 0 {
        warn!(path = %dest.display(), attrs, error = %std::io::Error::last_os_error(), "failed to set attributes on destination");
    } else {
        trace!(path = %dest.display(), attrs, "set attributes on destination");
    }
}

/// Preserve extended attributes (xattrs) from source path to destination path.
/// Requires the "xattrs" feature (otherwise this is a no-op).
fn preserve_xattrs(src: &Path, dest: &Path) {
    #[cfg(feature = "xattrs")]
    {
        match xattr::list(src) {
            Ok(names) => {
                for name in names {
                    let name_disp = name.to_string_lossy().into_owned();
                    match xattr::get(src, &name) {
                        Ok(value) => {
                            let value = value.unwrap_or_default();
                            if let Err(e) = xattr::set(dest, &name, &value) {
                                warn!(src=%src.display(), dest=%dest.display(), xattr=%name_disp, error=%e, "failed to set xattr on destination");
                            } else {
                                trace!(src=%src.display(), dest=%dest.display(), xattr=%name_disp, size=value.len(), "preserved xattr");
                            }
                        }
                        Err(e) => {
                            warn!(src=%src.display(), xattr=%name_disp, error=%e, "failed to read xattr value from source");
                        }
                    }
                }
            }
            Err(e) => {
                warn!(src=%src.display(), error=%e, "failed to list xattrs; continuing");
            }
        }
    }
    #[cfg(not(feature = "xattrs"))]
    {
        let _ = (src, dest);
    }
}
