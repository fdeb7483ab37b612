use std::fmt;

/// Result type for lifelog-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the engine layer
#[derive(Debug)]
pub enum Error {
    /// Store layer error
    Store(lifelog_store::Error),

    /// External provider error that no fallback could absorb
    Provider(lifelog_providers::Error),

    /// Invalid input to an engine operation
    Invalid(String),

    /// Taxonomy resources could not be read or written
    Resources(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "Store error: {}", err),
            Error::Provider(err) => write!(f, "Provider error: {}", err),
            Error::Invalid(msg) => write!(f, "Invalid input: {}", msg),
            Error::Resources(msg) => write!(f, "Resource error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Provider(err) => Some(err),
            Error::Invalid(_) | Error::Resources(_) => None,
        }
    }
}

impl From<lifelog_store::Error> for Error {
    fn from(err: lifelog_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<lifelog_providers::Error> for Error {
    fn from(err: lifelog_providers::Error) -> Self {
        Error::Provider(err)
    }
}
