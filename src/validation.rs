//! Path safety checks run before anything is moved.
//!
//! The checks are advisory and string based: the path is not canonicalized,
//! so a protected location reached through a differently spelled path (for
//! example via a link) is not recognized. Checks run in a fixed order and the
//! first failure wins:
//!
//! 1. empty or blank
//! 2. not valid Unicode (the ledger stores paths as text)
//! 3. not absolute
//! 4. neither an existing file nor directory
//! 5. carries the "system" attribute
//! 6. lies under a protected directory (case-insensitive substring)
//! 7. is a critical system file (case-insensitive file name match)
//! 8. is a volume root

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::errors::ValidationError;
use crate::platform;

/// Protected directory markers, matched as case-insensitive substrings of the
/// path with separators normalized to `\`.
const PROTECTED_DIR_MARKERS: &[&str] = &[
    r"\Windows\",
    r"\Windows",
    r"\Program Files\",
    r"\Program Files",
    r"\Program Files (x86)\",
    r"\Program Files (x86)",
    r"\ProgramData\",
    r"\ProgramData",
    r"\Recovery\",
    r"\Recovery",
    r"\$Recycle.Bin\",
    r"\$Recycle.Bin",
    r"\System Volume Information\",
    r"\System Volume Information",
    r"\AppData\Local\Microsoft\",
    r"\AppData\Roaming\Microsoft\",
];

/// File names that must never be moved (compared case-insensitively).
const CRITICAL_FILE_NAMES: &[&str] = &[
    "NTUSER.DAT",
    "pagefile.sys",
    "swapfile.sys",
    "hiberfil.sys",
    "bootmgr",
    "BOOTNXT",
];

/// Top-level Unix system trees.
#[cfg(unix)]
const UNIX_SYSTEM_ROOTS: &[&str] = &[
    "/etc", "/usr", "/bin", "/sbin", "/lib", "/lib64", "/boot", "/proc", "/sys", "/dev",
];

/// Classifies candidate paths as migratable or rejected.
#[derive(Debug, Clone, Default)]
pub struct PathValidator {
    volume_roots: Vec<PathBuf>,
}

impl PathValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treat these directories as volume roots (configured mount points).
    pub fn with_volume_roots<I>(roots: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self { volume_roots: roots.into_iter().collect() }
    }

    /// Accept `path` or return the first reason it must not be moved.
    pub fn validate(&self, path: &Path) -> Result<(), ValidationError> {
        let raw = path.as_os_str().to_string_lossy();
        if raw.trim().is_empty() {
            return Err(ValidationError::Empty);
        }
        if path.to_str().is_none() {
            return Err(ValidationError::NotUnicode(path.to_path_buf()));
        }
        if !path.is_absolute() {
            return Err(ValidationError::NotAbsolute(path.to_path_buf()));
        }

        let meta = match fs::metadata(path) {
            Ok(m) if m.is_file() || m.is_dir() => m,
            _ => return Err(ValidationError::NotFound(path.to_path_buf())),
        };

        if platform::is_system_item(&meta) {
            return Err(ValidationError::SystemItem(path.to_path_buf()));
        }

        if let Some(marker) = protected_marker(&raw) {
            return Err(ValidationError::ProtectedLocation {
                path: path.to_path_buf(),
                marker: marker.trim_matches('\\').to_string(),
            });
        }

        if let Some(name) = critical_file_name(path) {
            return Err(ValidationError::CriticalFile {
                path: path.to_path_buf(),
                name: name.to_string(),
            });
        }

        if is_filesystem_root(path) || self.is_configured_root(path) {
            return Err(ValidationError::VolumeRoot(path.to_path_buf()));
        }

        Ok(())
    }

    fn is_configured_root(&self, path: &Path) -> bool {
        let trimmed = strip_trailing_separators(path);
        self.volume_roots
            .iter()
            .any(|root| strip_trailing_separators(root) == trimmed)
    }
}

fn protected_marker(raw: &str) -> Option<&'static str> {
    let haystack = raw.replace('/', "\\").to_lowercase();
    if let Some(m) = PROTECTED_DIR_MARKERS
        .iter()
        .find(|m| haystack.contains(&m.to_lowercase()))
    {
        return Some(m);
    }
    #[cfg(unix)]
    {
        let p = Path::new(raw);
        if let Some(root) = UNIX_SYSTEM_ROOTS.iter().find(|r| p.starts_with(r)) {
            return Some(root);
        }
    }
    None
}

fn critical_file_name(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_string_lossy();
    CRITICAL_FILE_NAMES
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(&name))
}

/// True when `path` consists only of a prefix and/or root (`C:\`, `/`).
fn is_filesystem_root(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
}

fn strip_trailing_separators(path: &Path) -> PathBuf {
    path.components().collect()
}
