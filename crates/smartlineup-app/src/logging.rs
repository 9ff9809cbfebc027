// Tracing setup. stdout carries the JSON reports, so logs go to a file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use smartlineup_core::config::LoggingConfig;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "smartlineup.log";

/// Filter directives in order of precedence: the command line, then
/// `RUST_LOG`, then the configured level. Blank values are skipped.
pub fn filter_directives(cli: Option<&str>, env: Option<&str>, config: &LoggingConfig) -> String {
    [cli, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|d| !d.is_empty())
        .unwrap_or(config.level.trim())
        .to_string()
}

/// Log directory, relative to `base_dir` unless configured as absolute.
pub fn log_dir(base_dir: &Path, config: &LoggingConfig) -> PathBuf {
    let dir = Path::new(&config.dir);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base_dir.join(dir)
    }
}

/// Install the global subscriber writing to `<dir>/smartlineup.log`.
pub fn init_tracing(dir: &Path, directives: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let log_file = std::fs::File::create(dir.join(LOG_FILE))?;

    let filter = EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter `{directives}`"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
