//! # findclass
//!
//! Locate Java classes inside the JAR/WAR/EAR archives of a directory tree, and
//! list, add or extract the entries of ZIP archives.
//!
//! ## Architecture
//!
//! - **lister**: Filtered, optionally recursive and sorted directory listing
//! - **comparator**: Modification-time, file-name and path-name orderings
//! - **options**: Recursion, case and sort option groups
//! - **pattern**: Compiled full-match filter sets
//! - **archive**: ZIP entry listing, lookup, append and extraction
//! - **rewrite**: Copy-rewrite transaction behind every archive mutation
//! - **pom**: Maven coordinates of an archive
//! - **finder**: Class search across all archives below a directory
//! - **diagnostics**: Recovered conditions such as dropped patterns
//! - **error**: Library error type

pub mod archive;
pub mod cli;
pub mod comparator;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod finder;
pub mod lister;
pub mod options;
pub mod pattern;
pub mod pom;
mod rewrite;
