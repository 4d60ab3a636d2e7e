use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "KB_LOG";
const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "kbstage.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// The TUI owns the terminal, so logs go to a file unless stderr is redirected.
pub fn resolve_target(config: &Config, stderr_is_terminal: bool) -> LogTarget {
    match &config.log_path {
        Some(path) => LogTarget::File(path.clone()),
        None if stderr_is_terminal => LogTarget::File(std::env::temp_dir().join(DEFAULT_LOG_FILE)),
        None => LogTarget::Stderr,
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Installs the global subscriber. Filter directives come from `KB_LOG`.
pub fn init(config: &Config) -> Result<LogTarget> {
    let target = resolve_target(config, std::io::stderr().is_terminal());
    let writer = match &target {
        LogTarget::File(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow!("installing log subscriber: {error}"))?;
    Ok(target)
}
