use thiserror::Error;

/// Reasons an upload sink refused a file.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The destination rejected the payload for its size (HTTP 413 or a
    /// configured limit).
    #[error("file is too large for the destination ({size} bytes)")]
    PayloadTooLarge { size: usize },

    #[error("upload rejected: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by an import run.
///
/// Only [`ImportError::ArchiveOpen`] ever escapes `run()`; the others are
/// recorded against the entry that caused them.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot open archive: {0}")]
    ArchiveOpen(String),

    #[error("entry not found in archive: {0}")]
    MissingEntry(String),

    #[error("cannot read entry: {0}")]
    Read(String),

    #[error("cannot decode image: {0}")]
    Decode(String),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ImportError {
    /// Short classification used in reports and logs.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::ArchiveOpen(_) => ErrorKind::ArchiveOpen,
            ImportError::MissingEntry(_) => ErrorKind::MissingEntry,
            ImportError::Read(_) => ErrorKind::Read,
            ImportError::Decode(_) => ErrorKind::Decode,
            ImportError::Upload(UploadError::PayloadTooLarge { .. }) => ErrorKind::PayloadTooLarge,
            ImportError::Upload(_) => ErrorKind::Upload,
        }
    }
}

/// Classification of an [`ImportError`], kept in the per-entry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ArchiveOpen,
    MissingEntry,
    Read,
    Decode,
    PayloadTooLarge,
    Upload,
}

pub type Result<T> = std::result::Result<T, ImportError>;
