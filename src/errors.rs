use std::fmt;

/// Custom error types for the terminal session library
#[derive(Debug)]
pub enum TermError {
    /// I/O related errors (network, file operations, etc.)
    Io(std::io::Error),

    /// The remote side went away
    ConnectionClosed,

    /// The shared buffer pool was closed while a caller was waiting on it
    PoolClosed,

    /// An inbound transport message could not be understood
    InvalidMessage(String),

    /// Configuration error
    Configuration(String),
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermError::Io(err) => write!(f, "I/O error: {}", err),
            TermError::ConnectionClosed => write!(f, "Connection closed"),
            TermError::PoolClosed => write!(f, "Buffer pool closed"),
            TermError::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            TermError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for TermError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TermError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TermError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                TermError::ConnectionClosed
            }
            _ => TermError::Io(err),
        }
    }
}

impl From<crate::config::ConfigError> for TermError {
    fn from(err: crate::config::ConfigError) -> Self {
        TermError::Configuration(err.to_string())
    }
}

/// Result type alias for terminal session operations
pub type TermResult<T> = Result<T, TermError>;
