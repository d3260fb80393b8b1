//! CLI definition and parsing.
//! Defines Args (global flags + subcommand) and provides parse().
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug and wins over it.
//! - Paths are trimmed of stray shell quotes before use.

use clap::{Parser, Subcommand, ValueHint};
use std::path::{Path, PathBuf};

use space_shift::{Config, LogLevel, RecordFilter, RecordId, VolumeId};

/// Relocate files and folders to another volume, leaving a symbolic link behind.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Relocate files and folders to another volume, leaving a link behind")]
pub struct Args {
    /// Override the ledger database location.
    #[arg(long, global = true, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub ledger: Option<PathBuf>,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(short = 'd', long, global = true, help = "Enable debug logging (shorthand for --log-level debug)")]
    pub debug: bool,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json_logs: bool,

    /// Print where space_shift will look for the config file, then exit.
    #[arg(long, help = "Print the config file location used by space_shift and exit")]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Move a file or folder to another volume and leave a link in its place.
    Migrate {
        #[arg(value_name = "PATH", value_hint = ValueHint::AnyPath)]
        path: PathBuf,
        /// Destination volume letter (e.g. D).
        #[arg(long = "to", value_name = "VOL")]
        to: VolumeId,
    },
    /// Put the content of a record back at its original location.
    Restore { id: RecordId },
    /// Move a restored record's content to its recorded target again.
    Remigrate { id: RecordId },
    /// List ledger records, newest first.
    List {
        #[arg(long, value_name = "VOL")]
        source: Option<VolumeId>,
        #[arg(long, value_name = "VOL")]
        target: Option<VolumeId>,
        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show known volumes with their capacity.
    Volumes {
        #[arg(long)]
        json: bool,
    },
    /// Volumes that appear as a source in the ledger.
    Sources,
    /// Volumes that appear as a target in the ledger.
    Targets,
    /// Remove a record from the ledger. Files are not touched.
    Delete { id: RecordId },
    /// Print where PATH would be placed on volume VOL.
    TargetPath {
        #[arg(value_name = "PATH", value_hint = ValueHint::AnyPath)]
        path: PathBuf,
        #[arg(long = "to", value_name = "VOL")]
        to: VolumeId,
    },
    /// Write a commented template config file and exit.
    InitConfig,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(ledger) = &self.ledger {
            cfg.ledger_path = ledger.clone();
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
    }
}

impl Command {
    /// Filter for `list`; None for every other command.
    pub fn record_filter(&self) -> Option<RecordFilter> {
        match self {
            Command::List { source, target, .. } => {
                let mut filter = RecordFilter::default();
                if let Some(v) = source {
                    filter = filter.source(*v);
                }
                if let Some(v) = target {
                    filter = filter.target(*v);
                }
                Some(filter)
            }
            _ => None,
        }
    }
}

/// Strip quotes a shell left around a path (PowerShell and CMD do this with
/// trailing backslashes) and Windows verbatim prefixes.
pub fn sanitize_path(p: &Path) -> PathBuf {
    let raw = p.to_string_lossy();
    let trimmed = raw.trim();
    let mut inner = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.trim_matches(|c| c == '\'' || c == '"').to_string()
    };
    inner.retain(|c| c != '\'' && c != '"');
    // One trailing separator, but never the root itself.
    if (inner.ends_with('\\') || inner.ends_with('/')) && inner.len() > 1 && !inner.ends_with(":\\") {
        inner.pop();
    }
    dunce::simplified(Path::new(&inner)).to_path_buf()
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_wins_over_log_level() {
        let args = Args::try_parse_from(["space_shift", "--log-level", "quiet", "--debug", "sources"]).unwrap();
        assert_eq!(args.effective_log_level(), Some(LogLevel::Debug));
    }

    #[test]
    fn migrate_parses_volume_letter() {
        let args = Args::try_parse_from(["space_shift", "migrate", "/data/big", "--to", "e:"]).unwrap();
        match args.command {
            Some(Command::Migrate { path, to }) => {
                assert_eq!(path, PathBuf::from("/data/big"));
                assert_eq!(to.letter(), 'E');
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_volume_is_a_parse_error() {
        assert!(Args::try_parse_from(["space_shift", "migrate", "/x", "--to", "42"]).is_err());
    }

    #[test]
    fn overrides_apply_ledger_and_level() {
        let args = Args::try_parse_from(["space_shift", "--ledger", "/tmp/l.db", "list", "--log-level", "info"]).unwrap();
        let mut cfg = Config::default();
        args.apply_overrides(&mut cfg);
        assert_eq!(cfg.ledger_path, PathBuf::from("/tmp/l.db"));
        assert_eq!(cfg.log_level, LogLevel::Info);
    }

    #[test]
    fn list_filter_carries_volumes() {
        let args = Args::try_parse_from(["space_shift", "list", "--source", "C", "--target", "d"]).unwrap();
        let filter = args.command.unwrap().record_filter().unwrap();
        assert_eq!(filter.source_volume.map(|v| v.letter()), Some('C'));
        assert_eq!(filter.target_volume.map(|v| v.letter()), Some('D'));
    }

    #[test]
    fn sanitize_strips_quotes_and_trailing_separator() {
        assert_eq!(sanitize_path(Path::new("'/data/movies/'")), PathBuf::from("/data/movies"));
        assert_eq!(sanitize_path(Path::new("\"/data/a b\"")), PathBuf::from("/data/a b"));
        assert_eq!(sanitize_path(Path::new("/")), PathBuf::from("/"));
    }
}
