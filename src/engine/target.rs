//! Target path derivation.

use std::path::{Path, PathBuf};

use crate::volumes::VolumeId;

/// Directory on every target volume that holds relocated content.
pub const MOVED_FILES_DIR: &str = "MovedFiles";

/// `{target_root}/MovedFiles/{source_volume}/{remainder}`, where `remainder`
/// is the source path with its volume root stripped.
pub fn moved_files_path(target_root: &Path, source_volume: VolumeId, remainder: &Path) -> PathBuf {
    target_root
        .join(MOVED_FILES_DIR)
        .join(source_volume.to_string())
        .join(remainder)
}
