//! Error taxonomy shared by the lister and the archive store.

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("entry `{name}` not found in {}", .archive.display())]
    EntryNotFound { archive: PathBuf, name: String },

    #[error("not a valid zip archive: {}", .path.display())]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("I/O failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive was renamed away but its replacement was never completed.
    /// The previous contents survive only in `backup`.
    #[error(
        "rewrite of {} did not complete; previous contents kept at {}",
        .archive.display(),
        .backup.display()
    )]
    PartialRewrite {
        archive: PathBuf,
        backup: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Maps a zip error on `path` onto the taxonomy.
    pub fn from_zip(path: &Path, err: zip::result::ZipError) -> Self {
        use zip::result::ZipError;
        match err {
            ZipError::Io(source) => Self::io(path, source),
            ZipError::FileNotFound => Self::EntryNotFound {
                archive: path.to_path_buf(),
                name: String::new(),
            },
            other => Self::CorruptArchive {
                path: path.to_path_buf(),
                source: other,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ArchiveNotFound(_) | Self::EntryNotFound { .. })
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptArchive { .. })
    }
}
