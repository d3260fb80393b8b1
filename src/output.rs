//! Small wrapper around stdout/stderr printing to provide consistent, colored
//! user-facing messages. Colors are enabled only when the stream is a TTY.

use owo_colors::OwoColorize;

fn stdout_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

fn stderr_tty() -> bool {
    atty::is(atty::Stream::Stderr)
}

pub fn print_info(msg: &str) {
    if stdout_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {msg}");
    }
}

pub fn print_warn(msg: &str) {
    if stderr_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {msg}");
    }
}

pub fn print_error(msg: &str) {
    if stderr_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {msg}");
    }
}

pub fn print_success(msg: &str) {
    if stdout_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {msg}");
    }
}

/// Plain line, no prefix; for primary output users may script against.
pub fn print_user(msg: &str) {
    println!("{msg}");
}

/// Mark text as a problem when colors are enabled (e.g. invalid ledger rows).
pub fn flag_bad(text: &str) -> String {
    if stdout_tty() {
        text.red().to_string()
    } else {
        text.to_string()
    }
}
