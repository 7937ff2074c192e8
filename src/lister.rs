//! Filtered directory listing.
//!
//! Entries are matched by bare file name against a [`FilterSet`]. Depending on
//! [`RecursionMode`] the walk descends into every directory, only into
//! directories that match a pattern, or not at all. The walk is depth-first,
//! follows links and reports each subtree right after its directory.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ignore::{DirEntry, WalkBuilder};

use crate::comparator::EntryComparator;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::options::{RecursionMode, SearchOptions, SortKey};
use crate::pattern::FilterSet;

pub const DEFAULT_DIRECTORY: &str = ".";

pub fn list<S: AsRef<str>>(directory: &str, patterns: &[S], options: &SearchOptions) -> Vec<String> {
    let mut diagnostics = Diagnostics::new();
    list_with(directory, patterns, options, None, &mut diagnostics)
}

/// Lists and sorts with `comparator`, ignoring any sort key in `options`.
pub fn list_sorted_by<S, F>(
    directory: &str,
    patterns: &[S],
    options: &SearchOptions,
    comparator: F,
) -> Vec<String>
where
    S: AsRef<str>,
    F: Fn(&str, &str) -> Ordering,
{
    let mut diagnostics = Diagnostics::new();
    list_with(directory, patterns, options, Some(&comparator), &mut diagnostics)
}

pub fn list_with<S: AsRef<str>>(
    directory: &str,
    patterns: &[S],
    options: &SearchOptions,
    comparator: Option<&dyn Fn(&str, &str) -> Ordering>,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let root = resolve_directory(directory);
    if !root.is_dir() {
        tracing::debug!(directory = %root.display(), "not a directory, nothing to list");
        return Vec::new();
    }

    let filters = FilterSet::compile_or_match_all(patterns, options.ignore_case(), diagnostics);
    let mut found = collect(&root, &filters, options.recursion, diagnostics);

    if let Some(cmp) = comparator {
        found.sort_by(|a, b| cmp(a.as_str(), b.as_str()));
    } else if options.sort != SortKey::None {
        EntryComparator::from_options(options).sort(&mut found);
    }

    tracing::debug!(
        directory = %root.display(),
        matches = found.len(),
        "listing complete"
    );
    found
}

/// Polls `directory` every `interval` until a file matches, returning the first
/// match. A `cancel` predicate returning true after an empty scan ends the wait
/// with `None`.
pub fn wait_for_file<S: AsRef<str>>(
    interval: Duration,
    directory: &str,
    patterns: &[S],
    cancel: Option<&dyn Fn() -> bool>,
) -> Option<String> {
    let options = SearchOptions::default();
    let root = resolve_directory(directory);
    let mut diagnostics = Diagnostics::new();
    let filters = FilterSet::compile_or_match_all(patterns, options.ignore_case(), &mut diagnostics);

    let mut attempt = 0u64;
    loop {
        attempt += 1;
        let mut found = if root.is_dir() {
            collect(&root, &filters, options.recursion, &mut diagnostics)
        } else {
            Vec::new()
        };
        tracing::trace!(attempt, directory = %root.display(), "polled for file");

        if !found.is_empty() {
            return Some(found.swap_remove(0));
        }
        if cancel.is_some_and(|c| c()) {
            tracing::debug!(attempt, "wait for file cancelled");
            return None;
        }
        std::thread::sleep(interval);
    }
}

/// Canonical form of `path`, or its absolute form when it cannot be resolved.
pub fn resolve_path(path: &Path) -> String {
    let resolved = fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf());
    resolved.to_string_lossy().to_string()
}

fn resolve_directory(directory: &str) -> PathBuf {
    if directory.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from(DEFAULT_DIRECTORY));
    }
    PathBuf::from(directory)
}

fn collect(
    root: &Path,
    filters: &FilterSet,
    recursion: RecursionMode,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let mut builder = WalkBuilder::new(root);
    builder.standard_filters(false).follow_links(true);
    match recursion {
        RecursionMode::None => {
            builder.max_depth(Some(1));
        }
        RecursionMode::MatchedOnly => {
            let prune = filters.clone();
            builder.filter_entry(move |entry| !is_dir(entry) || prune.matches(&entry.file_name().to_string_lossy()));
        }
        RecursionMode::All => {}
    }

    let mut found = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                record_walk_error(err, root, diagnostics);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        // Recursive modes descend into directories instead of reporting them.
        if recursion != RecursionMode::None && is_dir(&entry) {
            continue;
        }
        if filters.matches(&entry.file_name().to_string_lossy()) {
            found.push(resolve_path(entry.path()));
        }
    }

    found
}

fn is_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|t| t.is_dir())
}

fn record_walk_error(err: ignore::Error, root: &Path, diagnostics: &mut Diagnostics) {
    match err {
        ignore::Error::WithDepth { err, .. } => record_walk_error(*err, root, diagnostics),
        ignore::Error::Loop { child, .. } => {
            diagnostics.record(Diagnostic::DirectoryCycle { path: child });
        }
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Loop { child, .. } => {
                diagnostics.record(Diagnostic::DirectoryCycle { path: child });
            }
            inner => diagnostics.record(Diagnostic::UnreadableDirectory {
                path,
                message: inner.to_string(),
            }),
        },
        other => diagnostics.record(Diagnostic::UnreadableDirectory {
            path: root.to_path_buf(),
            message: other.to_string(),
        }),
    }
}
