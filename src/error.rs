//! Library-wide error types.
//!
//! Library modules return [`Error`] via `thiserror`, while the binary uses
//! `anyhow` for convenient top-level propagation.
//!
//! Errors split into two classes:
//!
//! - **Isolated**: a single unreadable file, a failed cover write. Scans log
//!   these and keep going.
//! - **Fatal**: the store is gone ([`Error::is_fatal`]). No ingestion or query
//!   can proceed, so scans stop and hand the error back.
//!
//! # Example
//!
//! ```ignore
//! use musicly::error::{Error, Result};
//!
//! async fn load(library: &Library, id: i64) -> Result<AlbumDetails> {
//!     library.get_album(id).await // store errors auto-convert
//! }
//! ```

use std::path::PathBuf;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Tag reading/writing error
    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// Path does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// No album row with this id
    #[error("Album not found: {0}")]
    AlbumNotFound(i64),

    /// No track row with this id
    #[error("Track not found: {0}")]
    TrackNotFound(i64),

    /// Cover image could not be materialized
    #[error("Cover error: {0}")]
    Cover(String),

    /// Rejected caller input
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A blocking task panicked or was cancelled
    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a metadata error.
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a cover error.
    pub fn cover(message: impl Into<String>) -> Self {
        Self::Cover(message.into())
    }

    /// Create an invalid input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error means the store itself is unavailable.
    ///
    /// Constraint violations and missing rows are not fatal; a closed or
    /// exhausted pool, broken database I/O or a failed migration is.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Database(e) => matches!(
                e,
                sqlx::Error::PoolClosed
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Configuration(_)
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Migrate(_)
            ),
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::TaskJoin(e.to_string())
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("/path/to/file.mp3");
        assert!(err.to_string().contains("/path/to/file.mp3"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::cover("unsupported image type").context("while adding cover to album 3");
        let msg = err.to_string();
        assert!(msg.contains("album 3"));
        assert!(msg.contains("unsupported image type"));
    }

    #[test]
    fn test_metadata_error() {
        let err = Error::metadata("/music/song.mp3", "unsupported format");
        let msg = err.to_string();
        assert!(msg.contains("song.mp3"));
        assert!(msg.contains("unsupported format"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::AlbumNotFound(7));
        let with_ctx = result.with_context("additional context");
        assert!(with_ctx.unwrap_err().to_string().contains("additional context"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Database(sqlx::Error::PoolClosed).is_fatal());
        assert!(Error::Database(sqlx::Error::PoolClosed).context("scan").is_fatal());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_fatal());
        assert!(!Error::metadata("/a.mp3", "bad tag").is_fatal());
        assert!(!Error::AlbumNotFound(1).is_fatal());
    }
}
