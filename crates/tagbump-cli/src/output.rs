//! Terminal output formatting utilities.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tagbump_core::{PromotionStatus, RegistryStatus};

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
///
/// Human-facing lines go to stderr so stdout carries only results.
pub fn success(msg: &str) {
    if !is_quiet() {
        eprintln!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        eprintln!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
pub fn detail(msg: &str) {
    if !is_quiet() {
        eprintln!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like commit ids.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Describe a promotion status for display.
#[must_use]
pub fn status_line(field: &str, status: &PromotionStatus) -> String {
    match status {
        PromotionStatus::Updated { previous, current } => {
            format!("{field}: {} → {}", previous.dimmed(), current.cyan().bold())
        }
        PromotionStatus::Unchanged { value } => {
            format!("{field} is already {}; nothing to commit", value.cyan())
        }
    }
}

/// Report a registry verdict; problems are warnings, never failures.
pub fn registry(tag: &str, status: &RegistryStatus) {
    match status {
        RegistryStatus::Found => info(&format!("Tag {tag} found in registry")),
        RegistryStatus::NotFound => warn(&format!(
            "Tag {tag} was not found in the registry - the deployment may fail to pull it"
        )),
        RegistryStatus::Failed(message) => warn(&format!("Could not verify tag {tag}: {message}")),
    }
}

/// Append `key=value` to the step output file named by `GITHUB_OUTPUT`, if set.
///
/// # Errors
/// Returns error if the file cannot be written.
pub fn github_output(key: &str, value: &str) -> std::io::Result<()> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) if !path.is_empty() => append_output(Path::new(&path), key, value),
        _ => Ok(()),
    }
}

fn append_output(path: &Path, key: &str, value: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{key}={value}")
}
