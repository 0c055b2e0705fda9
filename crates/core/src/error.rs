//! Unified error types for stratus.

use tokio_rusqlite::rusqlite;

/// Unified error types for the stratus workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid URL in the asset list or an intercepted request.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// No cache generation with the given name exists.
    #[error("GENERATION_MISSING: {0}")]
    GenerationMissing(String),

    /// Bulk precache aborted; the generation was left without
    /// completed installation status.
    #[error("PRECACHE_FAILED: {0}")]
    PrecacheFailed(String),

    /// Transport-level network failure (DNS, connect, offline).
    #[error("OFFLINE: {0}")]
    Offline(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP-level failure while building or issuing a request.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::GenerationMissing("app-shell-v2".to_string());
        assert!(err.to_string().contains("GENERATION_MISSING"));
        assert!(err.to_string().contains("app-shell-v2"));
    }

    #[test]
    fn test_precache_error_display() {
        let err = Error::PrecacheFailed("./manifest.json: status 500".to_string());
        assert!(err.to_string().contains("PRECACHE_FAILED"));
        assert!(err.to_string().contains("manifest.json"));
    }
}
