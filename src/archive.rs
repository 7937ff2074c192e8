//! Read and rewrite ZIP containers (JAR, WAR, EAR, plain ZIP).
//!
//! Read-only operations map the archive into memory. Every mutation goes through [`Rewrite`], which moves the
//! old archive aside and writes a complete new one.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use memmap2::Mmap;
use serde::Serialize;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::options::CaseMode;
use crate::pattern::FilterSet;
use crate::rewrite::{Rewrite, Sink, Source};

pub const SEPARATOR: char = '/';

type MappedArchive = ZipArchive<Cursor<Mmap>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub compressed_size: u64,
    pub last_modified: String,
}

impl ArchiveEntry {
    /// One listing line: `+` marks directories.
    pub fn describe(&self) -> String {
        format!(
            "{}{:<54}   Size: ({:6}/{:6})   {}",
            if self.is_dir { '+' } else { ' ' },
            self.name,
            self.size,
            self.compressed_size,
            self.last_modified
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    pub added: usize,
    pub carried_over: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractOutcome {
    pub extracted: usize,
    pub failed: Vec<String>,
}

pub fn normalize_entry_name(name: &str) -> String {
    name.replace('\\', "/")
}

#[derive(Debug)]
pub struct ArchiveStore {
    path: PathBuf,
    case: CaseMode,
    diagnostics: RefCell<Diagnostics>,
}

impl ArchiveStore {
    /// Entry filters are case-sensitive unless [`ArchiveStore::with_case`] says otherwise.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            case: CaseMode::Sensitive,
            diagnostics: RefCell::new(Diagnostics::new()),
        }
    }

    pub fn with_case(mut self, case: CaseMode) -> Self {
        self.case = case;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drains the conditions recovered so far (dropped patterns, cleanup failures).
    pub fn take_diagnostics(&self) -> Diagnostics {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Names of entries passing the directory policy and any of `filters`.
    ///
    /// With no filters, or none that compile, every entry passes.
    pub fn list_names<S: AsRef<str>>(
        &self,
        filters: Option<&[S]>,
        include_directories: bool,
    ) -> Result<Vec<String>> {
        let mut archive = self.open_read()?;
        let filters = self.compile_filters(filters);
        matching_names(&mut archive, &self.path, filters.as_ref(), include_directories)
    }

    /// Like [`ArchiveStore::list_names`], but a missing archive is created empty.
    pub fn list_names_or_create<S: AsRef<str>>(
        &self,
        filters: Option<&[S]>,
        include_directories: bool,
    ) -> Result<Vec<String>> {
        match self.list_names(filters, include_directories) {
            Err(Error::ArchiveNotFound(_)) => {
                self.create_empty()?;
                Ok(Vec::new())
            }
            other => other,
        }
    }

    pub fn find_entries(&self, pattern: &str) -> Result<Vec<String>> {
        self.list_names(Some([pattern].as_slice()), true)
    }

    pub fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        let mut archive = self.open_read()?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive
                .by_index_raw(i)
                .map_err(|e| Error::from_zip(&self.path, e))?;
            let dt = entry.last_modified();
            entries.push(ArchiveEntry {
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
                size: entry.size(),
                compressed_size: entry.compressed_size(),
                last_modified: format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    dt.year(),
                    dt.month(),
                    dt.day(),
                    dt.hour(),
                    dt.minute(),
                    dt.second()
                ),
            });
        }
        Ok(entries)
    }

    pub fn get_entry(&self, name: &str) -> Result<Vec<u8>> {
        let mut archive = self.open_read()?;
        self.read_entry(&mut archive, name)
    }

    pub fn get_string(&self, name: &str) -> Result<String> {
        let bytes = self.get_entry(name)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Contents of every entry whose name matches `pattern`, in archive order.
    pub fn entries_as_strings(&self, pattern: &str) -> Result<Vec<String>> {
        let mut archive = self.open_read()?;
        let filters = self.compile_filters(Some([pattern].as_slice()));
        let names = matching_names(&mut archive, &self.path, filters.as_ref(), true)?;

        let mut contents = Vec::with_capacity(names.len());
        for name in names {
            let bytes = self.read_entry(&mut archive, &name)?;
            contents.push(String::from_utf8_lossy(&bytes).into_owned());
        }
        Ok(contents)
    }

    /// Writes `source` as entry `name`, replacing any entry of the same name.
    /// Returns how many other entries were carried over.
    pub fn append_entry<R: Read>(&self, name: &str, mut source: R) -> Result<usize> {
        let name = normalize_entry_name(name);
        let archive_path = self.path.as_path();
        let mut diagnostics = self.diagnostics.borrow_mut();

        let carried = Rewrite::begin(archive_path)?.run(&mut diagnostics, |old, sink| {
            let carried = match old {
                Some(old) => copy_entries(old, sink, archive_path, |n| n != name)?,
                None => 0,
            };
            sink.start_file(name.as_str(), entry_options())
                .map_err(|e| Error::from_zip(archive_path, e))?;
            std::io::copy(&mut source, sink).map_err(|e| Error::io(&name, e))?;
            Ok(carried)
        })?;

        tracing::debug!(archive = %self.path.display(), entry = %name, carried, "entry appended");
        Ok(carried)
    }

    /// Text form of [`ArchiveStore::append_entry`].
    pub fn append_text(&self, name: &str, text: &str) -> Result<usize> {
        self.append_entry(name, text.as_bytes())
    }

    /// Adds each file as an entry named after its own path. Files that cannot
    /// be read are reported in `failed` and skipped.
    pub fn add_files<S: AsRef<str>>(&self, paths: &[S]) -> Result<AddOutcome> {
        let archive_path = self.path.as_path();
        let mut diagnostics = self.diagnostics.borrow_mut();

        let outcome = Rewrite::begin(archive_path)?.run(&mut diagnostics, |old, sink| {
            let mut outcome = AddOutcome::default();
            let mut added = write_files(sink, archive_path, paths, &mut outcome)?;
            added.sort();

            if let Some(old) = old {
                outcome.carried_over = copy_entries(old, sink, archive_path, |n| {
                    added.binary_search_by(|a| a.as_str().cmp(n)).is_err()
                })?;
            }
            Ok(outcome)
        })?;

        tracing::debug!(
            archive = %self.path.display(),
            added = outcome.added,
            carried_over = outcome.carried_over,
            failed = outcome.failed.len(),
            "files added"
        );
        Ok(outcome)
    }

    /// Replaces the archive with one holding exactly the readable `paths`.
    pub fn wrap<S: AsRef<str>>(&self, paths: &[S]) -> Result<AddOutcome> {
        let dir = parent_dir(&self.path);
        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;

        let mut outcome = AddOutcome::default();
        {
            let mut sink = ZipWriter::new(tmp.as_file());
            write_files(&mut sink, &self.path, paths, &mut outcome)?;
            sink.finish().map_err(|e| Error::from_zip(&self.path, e))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| Error::io(&self.path, e.error))?;
        Ok(outcome)
    }

    /// Writes every entry matching any of `patterns` to the path named by the
    /// entry. Existing files are only replaced when `overwrite` is set.
    pub fn extract_entries<S: AsRef<str>>(
        &self,
        patterns: &[S],
        overwrite: bool,
    ) -> Result<ExtractOutcome> {
        let mut outcome = ExtractOutcome::default();
        let mut archive = self.open_read()?;

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let names = match self.compile_filters(Some([pattern].as_slice())) {
                Some(filters) => matching_names(&mut archive, &self.path, Some(&filters), true)?,
                None => Vec::new(),
            };
            if names.is_empty() {
                outcome.failed.push(pattern.to_string());
                continue;
            }

            for name in names {
                match self.extract_one(&mut archive, &name, overwrite) {
                    Ok(true) => outcome.extracted += 1,
                    Ok(false) => outcome.failed.push(name),
                    Err(err) => {
                        tracing::debug!(entry = %name, error = %err, "extraction failed");
                        outcome.failed.push(name);
                    }
                }
            }
        }
        Ok(outcome)
    }

    // Ok(false): refused without reading the entry.
    fn extract_one(&self, archive: &mut MappedArchive, name: &str, overwrite: bool) -> Result<bool> {
        let dest = PathBuf::from(name);
        if dest.components().any(|c| c == Component::ParentDir) {
            tracing::warn!(entry = %name, "refusing to extract entry outside its root");
            return Ok(false);
        }

        if name.ends_with(SEPARATOR) {
            fs::create_dir_all(&dest).map_err(|e| Error::io(&dest, e))?;
            return Ok(true);
        }
        if dest.exists() && !overwrite {
            return Ok(false);
        }

        let entry_name = resolve_entry_name(archive, name)
            .ok_or_else(|| self.entry_not_found(name))?;
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut entry = archive
            .by_name(&entry_name)
            .map_err(|e| Error::from_zip(&self.path, e))?;
        let mut out = File::create(&dest).map_err(|e| Error::io(&dest, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| Error::io(&dest, e))?;
        out.flush().map_err(|e| Error::io(&dest, e))?;
        Ok(true)
    }

    // Unlike a rewrite source, a zero-length file is not a readable archive.
    fn open_read(&self) -> Result<MappedArchive> {
        if !self.path.exists() {
            return Err(Error::ArchiveNotFound(self.path.clone()));
        }
        let file = File::open(&self.path).map_err(|e| Error::io(&self.path, e))?;
        let meta = file.metadata().map_err(|e| Error::io(&self.path, e))?;
        if meta.is_dir() {
            return Err(Error::CorruptArchive {
                path: self.path.clone(),
                source: ZipError::InvalidArchive("path is a directory"),
            });
        }
        if meta.len() == 0 {
            return Err(Error::CorruptArchive {
                path: self.path.clone(),
                source: ZipError::InvalidArchive("empty file"),
            });
        }

        // SAFETY: The file is opened read-only and the map owns its own handle on
        // the pages; it is dropped together with the archive before we return.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(&self.path, e))?;
        ZipArchive::new(Cursor::new(mmap)).map_err(|e| Error::from_zip(&self.path, e))
    }

    fn create_empty(&self) -> Result<()> {
        let file = File::create_new(&self.path).map_err(|e| Error::io(&self.path, e))?;
        ZipWriter::new(file)
            .finish()
            .map_err(|e| Error::from_zip(&self.path, e))?;
        tracing::debug!(archive = %self.path.display(), "created empty archive");
        Ok(())
    }

    fn read_entry<R: Read + Seek>(&self, archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
        let normalized = normalize_entry_name(name);
        let mut entry = match archive.by_name(&normalized) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Err(self.entry_not_found(name)),
            Err(e) => return Err(Error::from_zip(&self.path, e)),
        };
        let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut buf)
            .map_err(|e| Error::io(&self.path, e))?;
        Ok(buf)
    }

    fn compile_filters<S: AsRef<str>>(&self, filters: Option<&[S]>) -> Option<FilterSet> {
        let filters = filters?;
        let mut diagnostics = self.diagnostics.borrow_mut();
        let set = FilterSet::compile(filters, self.case.ignore_case(), &mut diagnostics);
        (!set.is_empty()).then_some(set)
    }

    fn entry_not_found(&self, name: &str) -> Error {
        Error::EntryNotFound {
            archive: self.path.clone(),
            name: name.to_string(),
        }
    }
}

fn matching_names<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
    filters: Option<&FilterSet>,
    include_directories: bool,
) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| Error::from_zip(path, e))?;
        if !include_directories && entry.is_dir() {
            continue;
        }
        let name = entry.name();
        if filters.is_none_or(|f| f.matches(name)) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Tries the name as given, then its canonical and absolute file-system forms.
fn resolve_entry_name<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<String> {
    let candidates = [
        Some(normalize_entry_name(name)),
        fs::canonicalize(name)
            .ok()
            .map(|p| normalize_entry_name(&p.to_string_lossy())),
        std::path::absolute(name)
            .ok()
            .map(|p| normalize_entry_name(&p.to_string_lossy())),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|candidate| archive.by_name(candidate).is_ok())
}

fn copy_entries(
    old: &mut Source,
    sink: &mut Sink,
    path: &Path,
    keep: impl Fn(&str) -> bool,
) -> Result<usize> {
    let mut carried = 0usize;
    for i in 0..old.len() {
        let entry = old.by_index_raw(i).map_err(|e| Error::from_zip(path, e))?;
        if !keep(&normalize_entry_name(entry.name())) {
            continue;
        }
        sink.raw_copy_file(entry)
            .map_err(|e| Error::from_zip(path, e))?;
        carried += 1;
    }
    Ok(carried)
}

/// Writes each readable file; returns the entry names written.
fn write_files<W: Write + Seek, S: AsRef<str>>(
    sink: &mut ZipWriter<W>,
    archive_path: &Path,
    paths: &[S],
    outcome: &mut AddOutcome,
) -> Result<Vec<String>> {
    let mut written: Vec<String> = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let mut file = match open_regular_file(path) {
            Ok(file) => file,
            Err(err) => {
                tracing::debug!(file = %path, error = %err, "cannot read file");
                outcome.failed.push(path.to_string());
                continue;
            }
        };

        let name = normalize_entry_name(path);
        if written.contains(&name) {
            continue;
        }
        sink.start_file(name.as_str(), entry_options())
            .map_err(|e| Error::from_zip(archive_path, e))?;
        std::io::copy(&mut file, sink).map_err(|e| Error::io(path, e))?;
        written.push(name);
        outcome.added += 1;
    }
    Ok(written)
}

// Directories open fine on some platforms but fail on the first read.
fn open_regular_file(path: &str) -> std::io::Result<File> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(std::io::Error::other("not a regular file"));
    }
    Ok(file)
}

fn entry_options() -> FileOptions {
    FileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
