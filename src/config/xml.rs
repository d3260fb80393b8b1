//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Writes a commented template on request (`init-config`).
//!
//! Notes:
//! - This module only reads/writes the config file; semantic checks happen in validate.rs.
//! - Unknown XML fields are a hard error to surface misconfigurations early.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::paths::{default_config_path, default_ledger_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use crate::platform::write_private_file_new;
use crate::volumes::{VolumeId, VolumeMount};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(rename = "ledger_path")]
    ledger_path: Option<String>,
    #[serde(rename = "log_level")]
    log_level: Option<String>,
    #[serde(rename = "log_file")]
    log_file: Option<String>,
    /// Copy buffer size in KiB
    #[serde(rename = "copy_buffer_kib", default, deserialize_with = "de_u64_trimmed_opt")]
    copy_buffer_kib: Option<u64>,
    #[serde(rename = "volume", default)]
    volumes: Vec<XmlVolume>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XmlVolume {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@root")]
    root: String,
    #[serde(rename = "@label")]
    label: Option<String>,
}

// Trims surrounding whitespace for an optional u64.
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

/// Map XmlConfig -> Config. Missing fields keep their defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(p) = non_empty(parsed.ledger_path.as_deref()) {
        cfg.ledger_path = PathBuf::from(p);
    }
    if let Some(p) = non_empty(parsed.log_file.as_deref()) {
        cfg.log_file = Some(PathBuf::from(p));
    }
    if let Some(s) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = s.parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }
    if let Some(kib) = parsed.copy_buffer_kib {
        let bytes = kib
            .checked_mul(1024)
            .and_then(|b| usize::try_from(b).ok())
            .ok_or_else(|| anyhow!("copy_buffer_kib is too large: {kib}"))?;
        cfg.copy_buffer_size = bytes;
    }

    for v in parsed.volumes {
        let id: VolumeId = v.id.parse()?;
        let root = v.root.trim();
        if root.is_empty() {
            bail!("volume {id} has an empty root");
        }
        cfg.volumes.push(VolumeMount {
            id,
            root: PathBuf::from(root),
            label: non_empty(v.label.as_deref()).map(str::to_string),
        });
    }

    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    let cfg = xml_to_config(parsed).with_context(|| format!("config xml '{}'", path.display()))?;
    debug!(path = %path.display(), volumes = cfg.volumes.len(), "config loaded");
    Ok(cfg)
}

/// Outcome of resolving the configuration.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the values came from; None when defaults were used.
    pub source: Option<PathBuf>,
}

/// Load the config from `$SPACE_SHIFT_CONFIG` or the default location.
/// A missing file yields defaults; an explicitly named missing file is an error.
pub fn load_config() -> Result<LoadedConfig> {
    let explicit = std::env::var_os(super::CONFIG_ENV).is_some();
    let path = default_config_path()?;
    if !path.exists() {
        if explicit {
            bail!("config file named by {} does not exist: {}", super::CONFIG_ENV, path.display());
        }
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(LoadedConfig { config: Config::default(), source: None });
    }
    let config = load_config_from_xml_path(&path)?;
    Ok(LoadedConfig { config, source: Some(path) })
}

/// Commented template with the current defaults filled in.
pub fn template_contents() -> String {
    let ledger = default_ledger_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "/path/to/space_shift/ledger.db".into());
    let log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "/path/to/space_shift.log".into());
    let example_root = if cfg!(windows) { r"D:\" } else { "/mnt/data" };
    format!(
        "<!--\n  space_shift configuration (XML)\n\n  Fields:\n    ledger_path      -> SQLite ledger of all migrations\n    log_level        -> quiet | normal | info | debug\n    log_file         -> path to log file (optional; console output is kept)\n    copy_buffer_kib  -> per-file copy buffer in KiB (default 80)\n    volume           -> repeated; maps a volume letter to a root directory.\n                        Required where the OS has no drive letters; on Windows\n                        entries override detected drives.\n\n  Notes:\n    - CLI flags override XML values.\n    - Relocated content goes to <root>/MovedFiles/<source letter>/...\n-->\n<config>\n  <ledger_path>{ledger}</ledger_path>\n  <log_level>normal</log_level>\n  <log_file>{log}</log_file>\n  <copy_buffer_kib>80</copy_buffer_kib>\n  <!-- <volume id=\"D\" root=\"{example_root}\" label=\"Data\"/> -->\n</config>\n"
    )
}

/// Create the template config file (and parent directory).
/// Refuses to write through a symlinked ancestor or over an existing file.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!("Refusing to create config: ancestor of {} is a symlink", path.display());
    }
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    write_private_file_new(path, template_contents().as_bytes())?;
    info!(path = %path.display(), "created template config");
    Ok(())
}
