//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors raised by a console (ECON) session.
#[derive(Debug, Error)]
pub enum EconError {
    #[error("econ: already connected")]
    AlreadyConnected,

    #[error("econ: already disconnected")]
    AlreadyDisconnected,

    #[error("econ: disconnected")]
    Disconnected,

    #[error("econ: authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("econ: failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("econ: network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("econ: message cut short after {sent} of {total} lines: {source}")]
    PartialSend {
        sent: usize,
        total: usize,
        #[source]
        source: std::io::Error,
    },
}

impl EconError {
    /// Transport-level failure (as opposed to misuse or a rejected password).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. } | Self::Network(_) | Self::PartialSend { .. }
        )
    }
}

/// Errors that end a relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Econ(#[from] EconError),

    #[error("outbound channel closed")]
    OutboundClosed,

    #[error("relay already started")]
    AlreadyStarted,
}

impl RelayError {
    /// Whether a fresh relay for the same server may be started after this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Econ(e) => e.is_network(),
            Self::OutboundClosed | Self::AlreadyStarted => false,
        }
    }
}

/// Chat platform errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to send message to {destination}: {message}")]
    SendFailed { destination: u64, message: String },

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),
}

/// Result type alias for console operations.
pub type EconResult<T> = std::result::Result<T, EconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_are_retryable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = RelayError::from(EconError::Network(io));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_auth_failure_is_final() {
        let err = RelayError::from(EconError::AuthenticationFailed {
            reason: "Wrong password".to_string(),
        });
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Wrong password"));
    }

    #[test]
    fn test_lifecycle_errors_are_not_network() {
        assert!(!EconError::AlreadyConnected.is_network());
        assert!(!RelayError::from(EconError::Disconnected).is_retryable());
        assert!(!RelayError::AlreadyStarted.is_retryable());
    }
}
