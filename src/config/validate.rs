//! Config validation logic.
//! Volume ids must be unique, roots must be absolute existing directories and
//! the copy buffer must not be empty.

use anyhow::{bail, Result};
use std::collections::HashSet;
use tracing::{debug, error};

use super::types::Config;

impl Config {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for v in &self.volumes {
            if !seen.insert(v.id) {
                error!(volume = %v.id, "duplicate volume id in config");
                bail!("volume {} is configured more than once", v.id);
            }
            if !v.root.is_absolute() {
                bail!("root of volume {} must be absolute: {}", v.id, v.root.display());
            }
            if !v.root.is_dir() {
                error!(volume = %v.id, root = %v.root.display(), "volume root is not a directory");
                bail!(
                    "root of volume {} does not exist or is not a directory: {}",
                    v.id,
                    v.root.display()
                );
            }
        }
        if self.copy_buffer_size == 0 {
            bail!("copy buffer size must be greater than zero");
        }
        if self.ledger_path.as_os_str().is_empty() {
            bail!("ledger path must not be empty");
        }

        debug!(
            ledger = %self.ledger_path.display(),
            volumes = self.volumes.len(),
            buffer = self.copy_buffer_size,
            "config validated"
        );
        Ok(())
    }
}
