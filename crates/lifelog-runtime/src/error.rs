use std::fmt;

/// Result type for lifelog-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Store layer error
    Store(lifelog_store::Error),

    /// Provider layer error
    Provider(lifelog_providers::Error),

    /// Engine layer error
    Engine(lifelog_engine::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// A required collaborator is not configured
    NotConfigured(String),

    /// Unknown job, activity, or tag id
    NotFound(String),

    /// Invalid operation or state
    InvalidOperation(String),

    /// Job was cancelled cooperatively
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "Store error: {}", err),
            Error::Provider(err) => write!(f, "Provider error: {}", err),
            Error::Engine(err) => write!(f, "Engine error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::NotConfigured(msg) => write!(f, "Not configured: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Provider(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
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

impl From<lifelog_engine::Error> for Error {
    fn from(err: lifelog_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
