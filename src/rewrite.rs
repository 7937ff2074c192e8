//! Copy-rewrite transaction for ZIP archives.
//!
//! ZIP has no in-place update, so every mutation moves the archive aside,
//! streams the entries to keep into a fresh file at the original path and
//! removes the old copy only after the new one is finished.
//!
//! Once the archive has been renamed away the old contents live only in the
//! backup file. If the rewrite fails from that point on, the backup is left on
//! disk and reported through [`Error::PartialRewrite`].

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use zip::{ZipArchive, ZipWriter};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};

pub(crate) type Source = ZipArchive<File>;
pub(crate) type Sink = ZipWriter<File>;

pub(crate) struct Rewrite {
    archive: PathBuf,
    backup: Option<PathBuf>,
    settled: bool,
}

impl Rewrite {
    /// Validates and moves aside the current archive, if any.
    ///
    /// Nothing is touched when the archive is corrupt or the rename fails.
    pub(crate) fn begin(archive: &Path) -> Result<Self> {
        if !archive.exists() {
            tracing::debug!(archive = %archive.display(), "no previous archive, starting empty");
            return Ok(Self {
                archive: archive.to_path_buf(),
                backup: None,
                settled: false,
            });
        }

        open_source(archive)?;
        let backup = reserve_backup_path(archive)?;
        fs::rename(archive, &backup).map_err(|e| Error::io(archive, e))?;
        tracing::debug!(
            archive = %archive.display(),
            backup = %backup.display(),
            "moved archive aside for rewrite"
        );

        Ok(Self {
            archive: archive.to_path_buf(),
            backup: Some(backup),
            settled: false,
        })
    }

    /// Runs `body` with the previous archive (if any) and a writer for the new
    /// one, then finishes the writer and drops the backup.
    pub(crate) fn run<T, F>(mut self, diagnostics: &mut Diagnostics, body: F) -> Result<T>
    where
        F: FnOnce(Option<&mut Source>, &mut Sink) -> Result<T>,
    {
        match self.write(body) {
            Ok(value) => {
                self.commit(diagnostics);
                Ok(value)
            }
            Err(err) => Err(self.abandon(err, diagnostics)),
        }
    }

    fn write<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(Option<&mut Source>, &mut Sink) -> Result<T>,
    {
        let mut source = match self.backup.as_deref() {
            Some(backup) => open_source(backup)?,
            None => None,
        };

        let file = File::create(&self.archive).map_err(|e| Error::io(&self.archive, e))?;
        let mut sink = ZipWriter::new(file);
        let value = body(source.as_mut(), &mut sink)?;

        let file = sink
            .finish()
            .map_err(|e| Error::from_zip(&self.archive, e))?;
        file.sync_all().map_err(|e| Error::io(&self.archive, e))?;
        Ok(value)
    }

    fn commit(&mut self, diagnostics: &mut Diagnostics) {
        self.settled = true;
        let Some(backup) = self.backup.take() else {
            return;
        };
        if let Err(err) = fs::remove_file(&backup) {
            diagnostics.record(Diagnostic::CleanupFailed {
                path: backup,
                message: err.to_string(),
            });
        }
    }

    fn abandon(&mut self, err: Error, diagnostics: &mut Diagnostics) -> Error {
        self.settled = true;
        match self.backup.take() {
            Some(backup) => {
                tracing::error!(
                    archive = %self.archive.display(),
                    backup = %backup.display(),
                    error = %err,
                    "archive rewrite failed; previous contents kept in backup"
                );
                Error::PartialRewrite {
                    archive: self.archive.clone(),
                    backup,
                    source: Box::new(err),
                }
            }
            None => {
                // Nothing existed before; a half-written file is worth nothing.
                if let Err(rm) = fs::remove_file(&self.archive)
                    && self.archive.exists()
                {
                    diagnostics.record(Diagnostic::CleanupFailed {
                        path: self.archive.clone(),
                        message: rm.to_string(),
                    });
                }
                err
            }
        }
    }
}

impl Drop for Rewrite {
    fn drop(&mut self) {
        if !self.settled
            && let Some(backup) = self.backup.as_deref()
        {
            tracing::error!(
                archive = %self.archive.display(),
                backup = %backup.display(),
                "archive rewrite abandoned; previous contents kept in backup"
            );
        }
    }
}

/// Opens `path` as a rewrite source. A zero-length file counts as an empty archive.
pub(crate) fn open_source(path: &Path) -> Result<Option<Source>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let meta = file.metadata().map_err(|e| Error::io(path, e))?;
    if meta.is_dir() {
        return Err(Error::CorruptArchive {
            path: path.to_path_buf(),
            source: zip::result::ZipError::InvalidArchive("path is a directory"),
        });
    }
    if meta.len() == 0 {
        return Ok(None);
    }
    ZipArchive::new(file)
        .map(Some)
        .map_err(|e| Error::from_zip(path, e))
}

// The backup sits next to the archive so the rename never crosses filesystems.
fn reserve_backup_path(archive: &Path) -> Result<PathBuf> {
    let dir = archive
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "archive".to_string());

    let placeholder = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;
    let path = placeholder
        .into_temp_path()
        .keep()
        .map_err(|e| Error::io(dir, e.error))?;

    // Renaming onto an existing file is refused on some platforms.
    fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
    Ok(path)
}
