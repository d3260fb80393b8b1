//! Config module.
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_ledger_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{create_template_config, load_config, load_config_from_xml_path, LoadedConfig};

/// Environment variable naming the config file (or its directory).
pub const CONFIG_ENV: &str = "SPACE_SHIFT_CONFIG";

pub(crate) const APP_DIR: &str = "space_shift";
pub(crate) const CONFIG_FILE_NAME: &str = "config.xml";
pub(crate) const LEDGER_FILE_NAME: &str = "ledger.db";
pub(crate) const LOG_FILE_NAME: &str = "space_shift.log";
