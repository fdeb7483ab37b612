use std::fmt;

/// Result type for lifelog-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the store layer
#[derive(Debug)]
pub enum Error {
    /// Pool exhausted, handle invalid, or database unreachable
    Connection(String),

    /// A SQL operation failed
    Operation(rusqlite::Error),

    /// Schema initialization or migration failed
    Schema(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(msg) => write!(f, "Connection error: {}", msg),
            Error::Operation(err) => write!(f, "Operation error: {}", err),
            Error::Schema(msg) => write!(f, "Schema error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Operation(err) => Some(err),
            Error::Connection(_) | Error::Schema(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Operation(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Operation(rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
    }
}

impl Error {
    /// True for SQLITE_BUSY / SQLITE_LOCKED, the only errors worth one retry
    pub fn is_lock_timeout(&self) -> bool {
        match self {
            Error::Operation(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// True when a uniqueness constraint rejected the statement.
    /// Concurrent creators race here; the loser adopts the existing row.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Operation(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}
