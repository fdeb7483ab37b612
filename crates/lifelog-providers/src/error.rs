use std::fmt;

/// Result type for lifelog-providers operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur when talking to external collaborators
#[derive(Debug)]
pub enum Error {
    /// Transport-level failure (connect, TLS, timeout)
    Http(reqwest::Error),

    /// Provider returned a non-success status
    Api { status: u16, message: String },

    /// Missing or rejected credentials
    Auth(String),

    /// Response body did not match the expected shape
    Decode(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(err) => write!(f, "HTTP error: {}", err),
            Error::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Error::Auth(msg) => write!(f, "Auth error: {}", msg),
            Error::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Api { .. } | Error::Auth(_) | Error::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
