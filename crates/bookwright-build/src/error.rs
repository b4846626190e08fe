//! Error types for artifact packaging.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while writing pages, example files, reports or archives.
///
/// Any of these fails the unit being processed; they are not recovered
/// per file.
#[derive(Error, Debug)]
pub enum PackagingError {
    /// Filesystem operation on a specific path failed
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Zip writer failure
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Directory traversal failure
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two examples of one unit normalize to the same directory
    #[error("two examples share directory {}", path.display())]
    DuplicateExample { path: PathBuf },

    /// A walked file was not under the archive root
    #[error("{} is outside archive root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

impl PackagingError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PackagingError::Io { path, source }
    }
}

/// Result type for packaging operations.
pub type Result<T> = std::result::Result<T, PackagingError>;
