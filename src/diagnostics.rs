//! Recovered conditions that never abort an operation.
//!
//! Each event is logged through `tracing` when it is recorded and kept so that
//! callers (and tests) can inspect what was skipped.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A filter pattern failed to compile and was dropped.
    InvalidPattern { pattern: String, message: String },
    /// A directory could not be enumerated during a listing.
    UnreadableDirectory { path: PathBuf, message: String },
    /// A directory was reached a second time through a link and not re-entered.
    DirectoryCycle { path: PathBuf },
    /// Best-effort cleanup (closing, temp removal) failed.
    CleanupFailed { path: PathBuf, message: String },
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: Diagnostic) {
        match &event {
            Diagnostic::InvalidPattern { pattern, message } => {
                tracing::warn!(%pattern, %message, "dropping invalid filter pattern");
            }
            Diagnostic::UnreadableDirectory { path, message } => {
                tracing::debug!(path = %path.display(), %message, "skipping unreadable directory");
            }
            Diagnostic::DirectoryCycle { path } => {
                tracing::debug!(path = %path.display(), "directory already visited");
            }
            Diagnostic::CleanupFailed { path, message } => {
                tracing::warn!(path = %path.display(), %message, "cleanup failed");
            }
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn invalid_patterns(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            Diagnostic::InvalidPattern { pattern, .. } => Some(pattern.as_str()),
            _ => None,
        })
    }
}
