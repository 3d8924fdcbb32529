//! Error type shared by every core component.
//!
//! "Not found" is deliberately absent: lookups return `Option` and
//! deletions return a row count, so callers can tell an untracked path
//! apart from a tracked file with no chunks.

use std::path::PathBuf;
use std::time::Duration;

/// Boxed source error used by store backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for core operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid chunker parameters, provider settings, or a database built
    /// for a different embedding dimension.
    #[error("configuration error: {0}")]
    Config(String),

    /// The file could not be read from disk.
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not valid UTF-8 text.
    #[error("could not decode {} as UTF-8", path.display())]
    Decode { path: PathBuf },

    /// The embedding provider failed, was unreachable, or returned a
    /// malformed response.
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// A store read or transactional write failed.
    #[error("store error: {0}")]
    Store(#[source] BoxError),

    /// A per-file deadline expired before the file was committed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A caller-supplied argument was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Error::Provider(msg.into())
    }

    /// Wrap any backend error as a [`Error::Store`].
    pub fn store<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Store(err.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_mentions_path() {
        let err = Error::Read {
            path: PathBuf::from("/tmp/missing.md"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.md"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_store_wraps_source() {
        let err = Error::store("disk full");
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(err.to_string(), "store error: disk full");
    }
}
