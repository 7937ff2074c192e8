//! Three-way ordering of path strings for sorted listings.

use std::cmp::Ordering;
use std::path::Path;
use std::time::SystemTime;

use crate::options::{SearchOptions, SortDirection, SortKey};

/// Immutable sort strategy. Built once per sort and passed to the sort call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryComparator {
    key: SortKey,
    direction: SortDirection,
}

impl EntryComparator {
    /// `SortKey::None` falls back to modification time: a comparator that has
    /// to exist always orders by something.
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        let key = match key {
            SortKey::None => SortKey::ModificationTime,
            other => other,
        };
        Self { key, direction }
    }

    pub fn from_options(options: &SearchOptions) -> Self {
        Self::new(options.sort, options.direction)
    }

    pub fn key(&self) -> SortKey {
        self.key
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn reversed(self) -> Self {
        Self {
            key: self.key,
            direction: self.direction.flipped(),
        }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let ord = match self.key {
            SortKey::FileName => compare_ignore_case(file_name(a), file_name(b)),
            SortKey::PathName => compare_ignore_case(&resolved(a), &resolved(b)),
            SortKey::ModificationTime | SortKey::None => modified(a).cmp(&modified(b)),
        };
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }

    pub fn sort(&self, paths: &mut [String]) {
        paths.sort_by(|a, b| self.compare(a, b));
    }
}

pub fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

fn resolved(path: &str) -> String {
    crate::lister::resolve_path(Path::new(path))
}

// Read on every comparison; a file that vanished sorts as the epoch.
fn modified(path: &str) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
