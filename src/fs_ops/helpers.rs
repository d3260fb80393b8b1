//! I/O helper utilities.
//!
//! Provides small adapters to enrich io::Error with actionable context/hints,
//! usable with map_err in copy, link and engine code paths.
//!
//! Usage:
//!   // in functions returning Result<_, CopyError>
//!   fs::create_dir_all(dir).map_err(io_error_with_help("create directory", dir))?;
//!
//!   // in functions returning io::Result<_>
//!   File::open(p).map_err(io_error_with_help_io("open file", p))?;

use std::io;
use std::path::Path;

use crate::errors::CopyError;

/// Format a human-friendly message with op/path plus platform-aware hints.
pub(crate) fn describe_io_error(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);

    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            match code {
                libc::EACCES | libc::EPERM => {
                    msg.push_str(" (permission denied; check ownership and write permissions)");
                }
                libc::EBUSY | libc::ETXTBSY => {
                    msg.push_str(" (resource busy; close the application using it)");
                }
                libc::ENOENT => {
                    msg.push_str(" (path not found; verify it exists)");
                }
                libc::EEXIST => {
                    msg.push_str(" (already exists; remove the target first)");
                }
                libc::ENOSPC => {
                    msg.push_str(" (insufficient space on device)");
                }
                libc::EROFS => {
                    msg.push_str(" (read-only filesystem; cannot write here)");
                }
                libc::ELOOP => {
                    msg.push_str(" (too many symbolic link levels; possible symlink cycle)");
                }
                libc::ENAMETOOLONG => {
                    msg.push_str(" (filename or path too long)");
                }
                _ => {}
            }
        }
        #[cfg(windows)]
        {
            match code {
                5 => msg.push_str(" (access denied; check permissions or run elevated)"), // ERROR_ACCESS_DENIED
                32 | 33 => msg.push_str(" (file is in use by another process)"), // SHARING / LOCK VIOLATION
                2 | 3 => msg.push_str(" (path not found; verify it exists)"), // FILE / PATH NOT FOUND
                80 | 183 => msg.push_str(" (already exists; remove the target first)"), // FILE_EXISTS / ALREADY_EXISTS
                112 => msg.push_str(" (insufficient disk space)"),                // ERROR_DISK_FULL
                1314 => msg.push_str(" (privilege not held; enable Developer Mode or run elevated)"), // ERROR_PRIVILEGE_NOT_HELD
                206 => msg.push_str(" (filename or path too long)"),              // ERROR_FILENAME_EXCED_RANGE
                _ => {}
            }
        }
        msg.push_str(&format!(" [os code: {}]", code));
    } else {
        match e.kind() {
            io::ErrorKind::PermissionDenied => {
                msg.push_str(" (permission denied; check ownership and write permissions)");
            }
            io::ErrorKind::NotFound => {
                msg.push_str(" (path not found; verify it exists)");
            }
            io::ErrorKind::AlreadyExists => {
                msg.push_str(" (already exists; remove the target first)");
            }
            _ => {}
        }
    }

    msg
}

/// Adapter for copy code.
/// Returns a closure suitable for `.map_err(...)` that converts io::Error -> CopyError.
pub(crate) fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> CopyError + 'a {
    move |e: io::Error| CopyError::Io {
        message: describe_io_error(op, path, &e),
        source: e,
    }
}

/// Adapter for io::Result code (when the surrounding function returns io::Result).
/// Enriches the message while preserving the original ErrorKind.
pub(crate) fn io_error_with_help_io<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> io::Error + 'a {
    move |e: io::Error| io::Error::new(e.kind(), describe_io_error(op, path, &e))
}
