use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::options::{CaseMode, RecursionMode, SearchOptions, SortDirection, SortKey};

#[derive(Debug, Clone, Parser)]
#[command(name = "findclass")]
#[command(about = "Find Java classes inside JAR/WAR/EAR archives and manage ZIP entries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log traversal and rewrite details to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[arg(short = 'f', long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Search archives below DIR for classes
    Find {
        #[arg(long = "dir", short = 'd', value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Archive name filter, defaults to *.jar/*.war/*.ear
        #[arg(short = 'j', long = "jar", value_name = "REGEX")]
        jar_filters: Vec<String>,

        /// Package prefix, e.g. org.example
        #[arg(short = 'p', long = "package", value_name = "PACKAGE")]
        packages: Vec<String>,

        #[arg(short = 'i', long)]
        ignore_case: bool,

        #[arg(value_name = "CLASS")]
        classes: Vec<String>,
    },
    /// List files below DIR whose names match PATTERN
    #[command(group(ArgGroup::new("recursion").args(["recurse", "recurse_matched"])))]
    #[command(group(ArgGroup::new("casing").args(["case_sensitive", "ignore_case"])))]
    List {
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,

        #[arg(short = 'r', long)]
        recurse: bool,

        /// Only descend into directories whose names match
        #[arg(long)]
        recurse_matched: bool,

        #[arg(long)]
        case_sensitive: bool,

        #[arg(short = 'i', long)]
        ignore_case: bool,

        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        #[arg(long)]
        descending: bool,

        /// Poll every MS milliseconds until a match appears
        #[arg(long, value_name = "MS", num_args = 0..=1)]
        wait: Option<Option<u64>>,
    },
    /// Inspect or modify a ZIP archive
    Zip {
        #[command(subcommand)]
        action: ZipAction,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ZipAction {
    /// Describe every entry
    List { archive: PathBuf },
    /// Add files, replacing entries with the same name
    Put {
        archive: PathBuf,
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },
    /// Extract entries matching PATTERN to their recorded paths
    Get {
        archive: PathBuf,
        #[arg(value_name = "PATTERN", required = true)]
        patterns: Vec<String>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Print entries matching PATTERN as text
    Print {
        archive: PathBuf,
        #[arg(value_name = "PATTERN", required = true)]
        patterns: Vec<String>,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Mtime,
    Name,
    Path,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Mtime => SortKey::ModificationTime,
            SortArg::Name => SortKey::FileName,
            SortArg::Path => SortKey::PathName,
        }
    }
}

pub fn list_options(
    recurse: bool,
    recurse_matched: bool,
    case_sensitive: bool,
    ignore_case: bool,
    sort: Option<SortArg>,
    descending: bool,
) -> SearchOptions {
    let recursion = if recurse {
        RecursionMode::All
    } else if recurse_matched {
        RecursionMode::MatchedOnly
    } else {
        RecursionMode::None
    };
    let case = if case_sensitive {
        CaseMode::Sensitive
    } else if ignore_case {
        CaseMode::Insensitive
    } else {
        CaseMode::PlatformDefault
    };
    let direction = if descending {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    };
    SearchOptions::new()
        .recursion(recursion)
        .case(case)
        .sorted_by(sort.map(SortKey::from).unwrap_or(SortKey::None), direction)
}
