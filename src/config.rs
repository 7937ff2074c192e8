use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ROOT_ENV: &str = "FINDCLASS_ROOT";
pub const LOG_ENV: &str = "FINDCLASS_LOG";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Search root: the command-line value, else `FINDCLASS_ROOT`, else `.`.
pub fn resolve_root(arg: Option<&Path>) -> Result<PathBuf> {
    resolve_root_from(arg, env::var(ROOT_ENV).ok())
}

fn resolve_root_from(arg: Option<&Path>, from_env: Option<String>) -> Result<PathBuf> {
    if let Some(p) = arg {
        return expand_home(p);
    }
    match from_env.filter(|v| !v.trim().is_empty()) {
        Some(v) => expand_home(Path::new(&v)),
        None => Ok(PathBuf::from(crate::lister::DEFAULT_DIRECTORY)),
    }
}

/// Replaces a leading `~` with the home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir().context("Failed to resolve home directory")?;
    Ok(home.join(rest))
}

/// Filter directive for the log subscriber, or `None` when logging stays off.
pub fn log_filter(verbose: bool) -> Option<String> {
    log_filter_from(verbose, env::var(LOG_ENV).ok())
}

fn log_filter_from(verbose: bool, from_env: Option<String>) -> Option<String> {
    match from_env.filter(|v| !v.trim().is_empty()) {
        Some(v) => Some(v),
        None if verbose => Some("findclass=debug".to_string()),
        None => None,
    }
}

pub fn poll_interval(ms: Option<u64>) -> Duration {
    Duration::from_millis(ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
}
