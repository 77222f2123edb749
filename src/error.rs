use thiserror::Error;

/// Errors raised by the duplicate grouper.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupError {
    /// The similarity threshold is not a number in `0..=100`.
    #[error("invalid similarity threshold {0}: expected a value between 0 and 100")]
    InvalidThreshold(f64),
}

/// Errors raised by a music library client.
///
/// Fetch failures are fatal for a run and are never retried. Delete failures
/// are reported as-is; they are not attributed to a particular duplicate
/// group.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// The library cannot be reached or is busy.
    #[error("music library unavailable: {0}")]
    ServiceUnavailable(String),

    /// The library refused access.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Any other failure reported by the SQLite backend.
    #[error("library database error: {0}")]
    Database(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A library export could not be decoded.
    #[error("failed to parse library export: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for LibraryError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(ErrorCode::PermissionDenied | ErrorCode::AuthorizationForStatementDenied) => {
                Self::Authentication(err.to_string())
            }
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::NotADatabase,
            ) => Self::ServiceUnavailable(err.to_string()),
            _ => Self::Database(err),
        }
    }
}
