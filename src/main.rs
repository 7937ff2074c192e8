use anyhow::{Context, Result};
use clap::Parser;
use findclass::archive::ArchiveStore;
use findclass::cli::{self, Cli, Commands, OutputFormat, ZipAction};
use findclass::config;
use findclass::diagnostics::Diagnostics;
use findclass::finder::{self, FindReport, SearchRequest};
use findclass::lister;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = parse_cli()?;
    init_logging(cli.verbose)?;

    match cli.command.clone() {
        Commands::Find {
            dir,
            jar_filters,
            packages,
            ignore_case,
            classes,
        } => {
            let (dir, classes) = split_leading_dir(dir, classes, !packages.is_empty());
            if classes.is_empty() && packages.is_empty() {
                anyhow::bail!("No class or package to look for, see `findclass find --help`");
            }
            let root = config::resolve_root(dir.as_deref())?;
            let mut request = SearchRequest::new(root.to_string_lossy())
                .classes(classes)
                .packages(packages)
                .jar_filters(jar_filters);
            request.ignore_case = ignore_case;
            let report = finder::search(&request);
            write_find_output(&report, cli.format)?;
        }
        Commands::List {
            dir,
            patterns,
            recurse,
            recurse_matched,
            case_sensitive,
            ignore_case,
            sort,
            descending,
            wait,
        } => {
            let root = config::resolve_root(dir.as_deref())?;
            let root = root.to_string_lossy();
            let paths: Vec<String> = match wait {
                Some(ms) => {
                    let interval = config::poll_interval(ms);
                    lister::wait_for_file(interval, &root, &patterns, None)
                        .into_iter()
                        .collect()
                }
                None => {
                    let options =
                        cli::list_options(recurse, recurse_matched, case_sensitive, ignore_case, sort, descending);
                    let mut diagnostics = Diagnostics::new();
                    let paths = lister::list_with(&root, &patterns, &options, None, &mut diagnostics);
                    report_invalid_patterns(&diagnostics);
                    paths
                }
            };
            write_lines(&paths, cli.format)?;
        }
        Commands::Zip { action } => run_zip(action, cli.format)?,
    }

    Ok(())
}

fn parse_cli() -> Result<Cli> {
    let args: Vec<String> = std::env::args().collect();
    Ok(Cli::parse_from(rewrite_args_for_implicit_find(args)))
}

fn init_logging(verbose: bool) -> Result<()> {
    let Some(filter) = config::log_filter(verbose) else {
        return Ok(());
    };
    let filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid {} filter: {filter}", config::LOG_ENV))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn rewrite_args_for_implicit_find(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["find", "list", "zip", "help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "-f" || a == "--format" {
            idx += 2;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "find".to_string());
        }
    }

    args
}

/// `findclass find /some/dir Foo` names the directory positionally.
fn split_leading_dir(
    dir: Option<PathBuf>,
    mut classes: Vec<String>,
    has_packages: bool,
) -> (Option<PathBuf>, Vec<String>) {
    if dir.is_some() || classes.is_empty() {
        return (dir, classes);
    }
    if (classes.len() > 1 || has_packages) && Path::new(&classes[0]).is_dir() {
        let first = classes.remove(0);
        return (Some(PathBuf::from(first)), classes);
    }
    (dir, classes)
}

fn report_invalid_patterns(diagnostics: &Diagnostics) {
    for pattern in diagnostics.invalid_patterns() {
        eprintln!("[findclass] ignoring invalid pattern: {pattern}");
    }
}

fn run_zip(action: ZipAction, format: OutputFormat) -> Result<()> {
    match action {
        ZipAction::List { archive } => {
            let store = ArchiveStore::new(&archive);
            let entries = store
                .entries()
                .with_context(|| format!("Failed to list archive: {}", archive.display()))?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
                OutputFormat::Text => {
                    for (i, entry) in entries.iter().enumerate() {
                        println!("{} [{i:02}]:\t{}", archive.display(), entry.describe());
                    }
                }
            }
        }
        ZipAction::Put { archive, files } => {
            let store = ArchiveStore::new(&archive);
            let outcome = store
                .add_files(&files)
                .with_context(|| format!("Failed to update archive: {}", archive.display()))?;
            report_invalid_patterns(&store.take_diagnostics());
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Text => print_failures("Error zipping:", &outcome.failed),
            }
        }
        ZipAction::Get {
            archive,
            patterns,
            overwrite,
        } => {
            let store = ArchiveStore::new(&archive);
            let outcome = store
                .extract_entries(&patterns, overwrite)
                .with_context(|| format!("Failed to extract from archive: {}", archive.display()))?;
            report_invalid_patterns(&store.take_diagnostics());
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Text => print_failures("Error unzipping:", &outcome.failed),
            }
        }
        ZipAction::Print { archive, patterns } => {
            let store = ArchiveStore::new(&archive);
            let mut printed = PrintOutput::default();
            for pattern in patterns {
                match store.entries_as_strings(&pattern) {
                    Ok(contents) if !contents.is_empty() => printed.contents.extend(contents),
                    Ok(_) => printed.failed.push(pattern),
                    Err(err) => {
                        tracing::debug!(pattern = %pattern, error = %err, "print failed");
                        printed.failed.push(pattern);
                    }
                }
            }
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&printed)?),
                OutputFormat::Text if !printed.failed.is_empty() => {
                    print_failures("Error printing:", &printed.failed)
                }
                OutputFormat::Text => {
                    for content in &printed.contents {
                        println!("{content}");
                    }
                }
            }
        }
    }
    Ok(())
}

#[derive(Debug, Default, Serialize)]
struct PrintOutput {
    contents: Vec<String>,
    failed: Vec<String>,
}

fn print_failures(heading: &str, failed: &[String]) {
    if failed.is_empty() {
        return;
    }
    println!("{heading}");
    for f in failed {
        println!("{f}");
    }
}

fn write_lines(paths: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(paths)?),
        OutputFormat::Text => {
            for p in paths {
                println!("{p}");
            }
        }
    }
    Ok(())
}

fn write_find_output(report: &FindReport, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Text => render_find_text(report),
    };
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn render_find_text(report: &FindReport) -> String {
    let mut out = String::new();
    for hit in &report.archives {
        out.push_str(&hit.path);
        if !hit.build.is_empty() {
            out.push_str(&format!(
                "; Group: {}, Artifact: {}, Version: {}.",
                hit.build.group_id.as_deref().unwrap_or("[inherited]"),
                hit.build.artifact_id.as_deref().unwrap_or("-"),
                hit.build.version.as_deref().unwrap_or("-"),
            ));
        }
        out.push('\n');
        for (i, entry) in hit.entries.iter().enumerate() {
            out.push_str(&format!("\t[{i}]:\t\"{entry}\"\n"));
        }
    }
    for skipped in &report.skipped {
        eprintln!("[findclass] skipped {}: {}", skipped.path, skipped.reason);
    }
    for class in &report.loose_classes {
        out.push_str(class);
        out.push('\n');
    }
    out
}
