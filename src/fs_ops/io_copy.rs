//! Streaming single-file copy with progress.
//!
//! - Fixed-size buffer read/write loop; progress is advanced after every write.
//! - The destination is created or truncated (copy-back during recovery must be
//!   able to overwrite a partially restored tree).
//! - The destination is fsynced before returning so a following delete of the
//!   source never races unflushed data.
//!
//! Snapshot semantics: the source file is read once from start to EOF; if it grows
//! concurrently, the additional bytes are included and progress may pass 100%
//! of the planned total (the percentage saturates).

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use super::helpers::io_error_with_help;
use super::progress::ProgressTracker;
use crate::errors::CopyError;

/// Default copy buffer: 80 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 80 * 1024;

/// Copy `src` -> `dst` through a `buf_size` buffer. Returns bytes written.
pub(super) fn copy_file_with_progress(
    src: &Path,
    dst: &Path,
    buf_size: usize,
    tracker: &mut ProgressTracker<'_>,
) -> Result<u64, CopyError> {
    let mut src_f = File::open(src).map_err(io_error_with_help("open source file", src))?;
    let mut dst_f = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dst)
        .map_err(io_error_with_help("create destination file", dst))?;

    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut buf = vec![0u8; buf_size.max(1)];
    let mut written: u64 = 0;
    loop {
        let n = match src_f.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error_with_help("read source file", src)(e)),
        };
        dst_f
            .write_all(&buf[..n])
            .map_err(io_error_with_help("write destination file", dst))?;
        written += n as u64;
        tracker.advance(n as u64, &name);
    }

    dst_f.flush().map_err(io_error_with_help("flush destination file", dst))?;
    dst_f
        .sync_all()
        .map_err(io_error_with_help("sync destination file", dst))?;
    Ok(written)
}
