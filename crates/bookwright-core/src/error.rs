//! Error taxonomy for loading book content.

use std::path::PathBuf;

/// Errors produced while discovering and loading content units.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    /// No chapter or appendix sources were found. Fatal for a build.
    #[error("no content units found in {}", dir.display())]
    NoUnitsFound { dir: PathBuf },

    /// The source directory could not be listed.
    #[error("cannot read source directory {}: {source}", dir.display())]
    SourceDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The unit file is not valid TOML or does not match the unit schema.
    #[error("malformed unit {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The unit parsed but is missing its `[chapter]` / `[appendix]` table,
    /// or carries both.
    #[error("malformed unit {}: {reason}", path.display())]
    InvalidUnit { path: PathBuf, reason: String },

    /// A discovered unit file could not be read.
    #[error("cannot read unit {}: {source}", path.display())]
    ReadUnit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for content operations.
pub type Result<T> = std::result::Result<T, BookError>;
