//! Class search across archives below a directory.
//!
//! Lists candidate archives with the [`lister`](crate::lister), opens each one
//! with an [`ArchiveStore`] and reports the entries matching the class and
//! package filters, annotated with Maven coordinates where they can be found.

use serde::Serialize;

use crate::archive::ArchiveStore;
use crate::diagnostics::Diagnostics;
use crate::lister;
use crate::options::{CaseMode, RecursionMode, SearchOptions, SortDirection, SortKey};
use crate::pom::{self, BuildInfo};

/// JAR, WAR and EAR files in any letter case.
pub const DEFAULT_JAR_FILTER: &str = r"^.*\.[JjWwEe][AaJj][RrBb]$";

const CLASS_SUFFIX: &str = r"\.[Cc][Ll][Aa][Ss][Ss]";

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub root: String,
    pub jar_filters: Vec<String>,
    pub classes: Vec<String>,
    pub packages: Vec<String>,
    pub ignore_case: bool,
}

impl SearchRequest {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes.extend(classes.into_iter().map(Into::into));
        self
    }

    pub fn packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages.extend(packages.into_iter().map(Into::into));
        self
    }

    pub fn jar_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jar_filters.extend(filters.into_iter().map(Into::into));
        self
    }

    /// Class filters first, then package filters.
    pub fn entry_filters(&self) -> Vec<String> {
        let mut filters = class_filters(&self.classes);
        filters.extend(package_filters(&self.packages));
        filters
    }

    fn archive_filters(&self) -> Vec<String> {
        if self.jar_filters.is_empty() {
            vec![DEFAULT_JAR_FILTER.to_string()]
        } else {
            self.jar_filters.clone()
        }
    }

    fn listing_options(&self) -> SearchOptions {
        let case = if self.ignore_case {
            CaseMode::Insensitive
        } else {
            CaseMode::PlatformDefault
        };
        SearchOptions::new()
            .recursion(RecursionMode::All)
            .case(case)
            .sorted_by(SortKey::PathName, SortDirection::Ascending)
    }

    fn entry_case(&self) -> CaseMode {
        if self.ignore_case {
            CaseMode::Insensitive
        } else {
            CaseMode::Sensitive
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveHit {
    pub path: String,
    pub build: BuildInfo,
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FindReport {
    pub root: String,
    pub archives_scanned: usize,
    pub archives: Vec<ArchiveHit>,
    pub skipped: Vec<Skipped>,
    pub loose_classes: Vec<String>,
}

/// `Foo` becomes `^.*Foo\.class$` with a case-insensitive extension; names that
/// already end in `.class` only get the leading wildcard.
pub fn class_filters<S: AsRef<str>>(classes: &[S]) -> Vec<String> {
    classes
        .iter()
        .map(|c| {
            let c = c.as_ref();
            if c.to_ascii_lowercase().ends_with(".class") {
                format!("^.*{c}$")
            } else {
                format!("^.*{c}{CLASS_SUFFIX}$")
            }
        })
        .collect()
}

pub fn package_filters<S: AsRef<str>>(packages: &[S]) -> Vec<String> {
    packages
        .iter()
        .map(|p| format!("^.*{}.*{CLASS_SUFFIX}$", p.as_ref()))
        .collect()
}

/// Unreadable or non-ZIP archives end up in [`FindReport::skipped`]; they never
/// stop the scan.
pub fn search(request: &SearchRequest) -> FindReport {
    let options = request.listing_options();
    let filters = request.entry_filters();
    let mut diagnostics = Diagnostics::new();

    let candidates = lister::list_with(
        &request.root,
        &request.archive_filters(),
        &options,
        None,
        &mut diagnostics,
    );

    let mut report = FindReport {
        root: lister::resolve_path(std::path::Path::new(&request.root)),
        archives_scanned: candidates.len(),
        ..FindReport::default()
    };

    for path in candidates {
        let store = ArchiveStore::new(&path).with_case(request.entry_case());
        let entry_filters = (!filters.is_empty()).then_some(filters.as_slice());
        match store.list_names(entry_filters, false) {
            Ok(entries) if entries.is_empty() => {}
            Ok(entries) => {
                tracing::debug!(archive = %path, hits = entries.len(), "matched archive");
                let build = pom::read_build_info(&store);
                report.archives.push(ArchiveHit { path, build, entries });
            }
            Err(err) => {
                tracing::warn!(archive = %path, error = %err, "skipping archive");
                report.skipped.push(Skipped {
                    path,
                    reason: err.to_string(),
                });
            }
        }
    }

    if !filters.is_empty() {
        report.loose_classes = lister::list_with(&request.root, &filters, &options, None, &mut diagnostics);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!(
            "findclass_finder_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ));
        std::fs::create_dir_all(&p).unwrap();
        p
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    fn canonical(path: &Path) -> String {
        std::fs::canonicalize(path)
            .unwrap()
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn class_filters_append_case_insensitive_extension() {
        assert_eq!(
            class_filters(&["Foo", "Bar.CLASS"]),
            vec![r"^.*Foo\.[Cc][Ll][Aa][Ss][Ss]$", "^.*Bar.CLASS$"]
        );
        assert_eq!(
            package_filters(&["org.example"]),
            vec![r"^.*org.example.*\.[Cc][Ll][Aa][Ss][Ss]$"]
        );
    }

    #[test]
    fn entry_filters_put_classes_before_packages() {
        let request = SearchRequest::new(".").packages(["p"]).classes(["C"]);
        let filters = request.entry_filters();
        assert_eq!(filters.len(), 2);
        assert!(filters[0].contains('C'));
        assert!(filters[1].starts_with("^.*p.*"));
    }

    #[test]
    fn default_jar_filter_accepts_jar_war_ear() {
        let re = regex::Regex::new(DEFAULT_JAR_FILTER).unwrap();
        for name in ["a.jar", "b.WAR", "c.Ear"] {
            assert!(re.is_match(name), "{name}");
        }
        assert!(!re.is_match("d.zip"));
    }

    #[test]
    fn search_reports_hits_skips_and_loose_classes() {
        let root = temp_dir("search");
        let hit = root.join("lib/demo-1.0.jar");
        write_jar(
            &hit,
            &[
                ("org/example/Foo.class", b""),
                ("org/example/Other.class", b""),
                (
                    "META-INF/maven/org.example/demo/pom.properties",
                    b"groupId=org.example\nartifactId=demo\nversion=1.0\n",
                ),
            ],
        );
        write_jar(&root.join("lib/none.JAR"), &[("org/example/Bar.class", b"")]);
        std::fs::write(root.join("broken.jar"), b"not a zip").unwrap();
        std::fs::create_dir_all(root.join("classes/org/example")).unwrap();
        std::fs::write(root.join("classes/org/example/Foo.class"), b"").unwrap();

        let request = SearchRequest::new(root.to_string_lossy()).classes(["Foo"]);
        let report = search(&request);

        assert_eq!(report.archives_scanned, 3);
        assert_eq!(report.archives.len(), 1);
        assert_eq!(report.archives[0].path, canonical(&hit));
        assert_eq!(report.archives[0].entries, vec!["org/example/Foo.class"]);
        assert_eq!(report.archives[0].build.artifact_id.as_deref(), Some("demo"));

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, canonical(&root.join("broken.jar")));

        assert_eq!(
            report.loose_classes,
            vec![canonical(&root.join("classes/org/example/Foo.class"))]
        );

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn package_search_matches_entry_paths() {
        let root = temp_dir("package");
        let jar = root.join("a.jar");
        write_jar(
            &jar,
            &[("org/example/A.class", b""), ("com/other/B.class", b"")],
        );

        let report = search(&SearchRequest::new(root.to_string_lossy()).packages(["org.example"]));
        assert_eq!(report.archives.len(), 1);
        assert_eq!(report.archives[0].entries, vec!["org/example/A.class"]);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn search_of_missing_root_is_empty() {
        let root = temp_dir("missing").join("nope");
        let report = search(&SearchRequest::new(root.to_string_lossy()).classes(["Foo"]));
        assert_eq!(report.archives_scanned, 0);
        assert!(report.archives.is_empty());
        assert!(report.loose_classes.is_empty());
    }
}
