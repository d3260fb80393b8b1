//! Application orchestrator.
//! Loads/merges config, initializes logging, opens the ledger, builds the engine
//! and dispatches the subcommand. Long operations run on a worker thread while
//! this thread draws progress and forwards Ctrl-C as a cancellation request.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

use space_shift::config::{create_template_config, default_config_path, load_config, CONFIG_ENV};
use space_shift::{
    format_bytes, spawn, CancelToken, Copier, Ledger, LogLevel, MigrationEngine, MigrationError,
    MigrationRecord, Operation, OperationOutcome, SystemVolumes, VolumeId, VolumeInfo,
};

use crate::cli::{sanitize_path, Args, Command};
use crate::logging::init_tracing;
use crate::output as out;

/// Exit status for a run cancelled with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;
/// Exit status when no subcommand was given.
const EXIT_USAGE: u8 = 2;

/// Run the CLI application.
pub fn run(args: Args) -> Result<ExitCode> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = args.command.clone() else {
        out::print_error("No command given. Run `space_shift --help` for the list of commands.");
        return Ok(ExitCode::from(EXIT_USAGE));
    };

    if let Command::InitConfig = command {
        let path = default_config_path()?;
        create_template_config(&path)?;
        out::print_success(&format!("A template space_shift config was written to: {}", path.display()));
        out::print_info("Edit it to map volume letters to roots, then re-run. To use another location set SPACE_SHIFT_CONFIG.");
        return Ok(ExitCode::SUCCESS);
    }

    // Build config (may read XML). CLI args override config values.
    let loaded = load_config()?;
    let mut cfg = loaded.config;
    if let Some(raw) = args.log_level.as_deref()
        && LogLevel::parse(raw).is_none()
    {
        out::print_warn(&format!("Ignoring unknown log level '{raw}'"));
    }
    args.apply_overrides(&mut cfg);
    cfg.validate()?;

    // Held until return so buffered file logs are flushed.
    let _guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json_logs).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;

    match &loaded.source {
        Some(p) => debug!(config = %p.display(), "configuration loaded"),
        None => debug!("no config file; running with defaults"),
    }
    debug!(?command, ledger = %cfg.ledger_path.display(), "starting space_shift");

    let ledger = Ledger::open(&cfg.ledger_path)
        .with_context(|| format!("open ledger '{}'", cfg.ledger_path.display()))?;
    let engine = Arc::new(
        MigrationEngine::new(ledger)
            .with_volumes(Arc::new(SystemVolumes::detect(&cfg.volumes)))
            .with_copier(Copier::with_buffer_size(cfg.copy_buffer_size)),
    );
    let show_progress = cfg.log_level != LogLevel::Quiet;
    let filter = command.record_filter().unwrap_or_default();

    match command {
        Command::Migrate { path, to } => {
            let source = sanitize_path(&path);
            run_operation(engine, Operation::Migrate { source, target: to }, show_progress)
        }
        Command::Restore { id } => run_operation(engine, Operation::Restore(id), show_progress),
        Command::Remigrate { id } => run_operation(engine, Operation::Remigrate(id), show_progress),
        Command::List { json, .. } => {
            let records = engine.records(&filter)?;
            if json {
                out::print_user(&serde_json::to_string_pretty(&records)?);
            } else {
                print_records(&records);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Volumes { json } => {
            let volumes = engine.volumes();
            if json {
                out::print_user(&serde_json::to_string_pretty(&volumes)?);
            } else if volumes.is_empty() {
                out::print_warn("No volumes known. Map letters to roots with <volume> entries in the config file.");
            } else {
                volumes.iter().for_each(print_volume);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Sources => {
            print_letters(&engine.source_volumes()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Targets => {
            print_letters(&engine.target_volumes()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Delete { id } => {
            if engine.delete_record(id)? {
                out::print_success(&format!("Record #{id} removed from the ledger (files untouched)"));
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(fail(&MigrationError::NotFound(id)))
            }
        }
        Command::TargetPath { path, to } => match engine.target_path(&sanitize_path(&path), to) {
            Ok(p) => {
                out::print_user(&p.display().to_string());
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(fail(&e)),
        },
        Command::InitConfig => Ok(ExitCode::SUCCESS),
    }
}

fn print_config_location() {
    if let Some(cfg_env) = std::env::var_os(CONFIG_ENV) {
        out::print_info(&format!(
            "Using {CONFIG_ENV} (explicit):\n  {}\n",
            Path::new(&cfg_env).display()
        ));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default space_shift config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run `space_shift init-config` to create a template.");
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a default config path: {e}")),
    }
}

/// Run `op` on a worker, drawing its progress until it finishes.
fn run_operation(engine: Arc<MigrationEngine>, op: Operation, show_progress: bool) -> Result<ExitCode> {
    let name = op.name();
    let task = spawn(engine, op).context("start worker thread")?;
    install_interrupt_handler(task.cancel_token());

    let bar = progress_bar(show_progress);
    for p in task.progress().iter() {
        bar.set_length(p.total_bytes);
        bar.set_position(p.copied_bytes);
        let file = Path::new(&p.current_file)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        bar.set_message(file);
    }
    bar.finish_and_clear();

    let outcome = task.join()?;
    Ok(report(name, &outcome))
}

fn progress_bar(visible: bool) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    if !visible {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }
    let style = ProgressStyle::with_template("{spinner} [{bar:40}] {bytes}/{total_bytes} ({eta}) {wide_msg}")
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

fn install_interrupt_handler(token: CancelToken) {
    let result = ctrlc::set_handler(move || {
        out::print_warn("Received interrupt; cancelling after the current chunk...");
        token.cancel();
    });
    if let Err(e) = result {
        warn!(error = %e, "could not install Ctrl-C handler; interrupts will not cancel cleanly");
    }
}

fn report(name: &str, outcome: &OperationOutcome) -> ExitCode {
    match outcome {
        OperationOutcome::Completed(rec) => {
            info!(op = name, id = rec.id, "operation finished");
            out::print_success(&format!(
                "{name} #{}: {} -> {} ({})",
                rec.id,
                rec.source_path.display(),
                rec.target_path.display(),
                format_bytes(rec.size)
            ));
            ExitCode::SUCCESS
        }
        OperationOutcome::Cancelled => {
            out::print_warn(&format!("{name} cancelled"));
            ExitCode::from(EXIT_CANCELLED)
        }
        OperationOutcome::Failed(e) => fail(e),
    }
}

fn fail(e: &MigrationError) -> ExitCode {
    out::print_error(&e.to_string());
    ExitCode::from(u8::try_from(e.code()).unwrap_or(1))
}

fn print_records(records: &[MigrationRecord]) {
    let mut invalid = 0usize;
    for r in records {
        let validity = if r.is_valid {
            String::new()
        } else {
            invalid += 1;
            format!(" {}", out::flag_bad("[invalid]"))
        };
        out::print_user(&format!(
            "#{:<5} {:<8} {:<9} {:>10}  {}  {} -> {}{validity}",
            r.id,
            r.status.as_str(),
            r.kind_str(),
            format_bytes(r.size),
            r.migrated_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            r.source_path.display(),
            r.target_path.display(),
        ));
    }
    out::print_user(&format!("{} records, {invalid} invalid", records.len()));
}

fn print_volume(v: &VolumeInfo) {
    out::print_user(&format!(
        "{}:  {:<16} {:>10} free of {:>10} ({:.1}% used)  {}",
        v.id,
        v.label,
        format_bytes(v.free_bytes),
        format_bytes(v.total_bytes),
        v.used_percentage(),
        v.root.display()
    ));
}

fn print_letters(ids: &[VolumeId]) {
    for id in ids {
        out::print_user(&id.to_string());
    }
}
