//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/ledger/log paths and detects symlinked ancestors for safety.

use anyhow::{anyhow, Result};
use dirs::{config_dir, data_dir, data_local_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{APP_DIR, CONFIG_ENV, CONFIG_FILE_NAME, LEDGER_FILE_NAME, LOG_FILE_NAME};

/// Config file location.
///
/// `$SPACE_SHIFT_CONFIG` wins when set: a relative value is taken from the
/// current directory and a directory value gets `config.xml` appended.
/// Otherwise the OS config dir is used.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(raw) = env::var_os(CONFIG_ENV) {
        let mut p = PathBuf::from(raw);
        if p.as_os_str().is_empty() {
            return Err(anyhow!("{CONFIG_ENV} is set but empty"));
        }
        if p.is_relative() {
            p = env::current_dir()?.join(p);
        }
        if p.is_dir() {
            p.push(CONFIG_FILE_NAME);
        }
        return Ok(p);
    }
    config_dir()
        .map(|base| base.join(APP_DIR).join(CONFIG_FILE_NAME))
        .ok_or_else(|| anyhow!("cannot determine the OS config directory; set {CONFIG_ENV}"))
}

/// OS-appropriate default ledger path (local data dir).
pub fn default_ledger_path() -> Option<PathBuf> {
    data_local_dir().map(|base| base.join(APP_DIR).join(LEDGER_FILE_NAME))
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Option<PathBuf> {
    data_dir().map(|base| base.join(APP_DIR).join(LOG_FILE_NAME))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
