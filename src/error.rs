//! Error types for kvstow
//!
//! Provides a unified error type for all operations.
//!
//! Callers see four user-facing categories: connection failures, store
//! command failures, not-found, and codec (encode/decode) failures. The
//! remaining variants are lower-level causes that the operation wrapper
//! folds into `Connection` / `Store` with the attempted op name attached.

use thiserror::Error;

/// Result type alias using StowError
pub type Result<T> = std::result::Result<T, StowError>;

/// Unified error type for kvstow operations
#[derive(Debug, Error)]
pub enum StowError {
    // -------------------------------------------------------------------------
    // I/O and Wire Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Connection / Pool Errors
    // -------------------------------------------------------------------------
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Invalid store URI: {0}")]
    InvalidUri(String),

    /// Acquiring a connection for the named operation failed
    #[error("Unable to acquire store connection for \"{op}\"")]
    Connection {
        op: String,
        #[source]
        source: Box<StowError>,
    },

    // -------------------------------------------------------------------------
    // Store Command Errors
    // -------------------------------------------------------------------------
    /// A store command was attempted and failed. Carries the diagnostic
    /// op name and the attempted key/field for error attribution.
    #[error("Store command \"{op}\" failed")]
    Store {
        op: String,
        key: Option<String>,
        field: Option<String>,
        #[source]
        source: Box<StowError>,
    },

    /// The store itself rejected the command with an error reply
    #[error("Store rejected command: {message}")]
    Rejected { message: String },

    #[error("No entry found for key \"{key}\"{}", field_suffix(.field))]
    NotFound {
        key: String,
        field: Option<String>,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Error encoding entry for key \"{key}\"")]
    Encode {
        key: String,
        #[source]
        source: bincode::Error,
    },

    #[error("Error decoding entry: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<bincode::Error>,
    },

    /// A decoded mapping carried no identity key and no fallback was given
    #[error("Decoded mapping has no identity key and no fallback was provided")]
    MissingIdentity,
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(name) => format!(" (hash field \"{name}\")"),
        None => String::new(),
    }
}

impl StowError {
    /// True when this error (or its wrapped cause) is the recoverable
    /// not-found condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Store { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// True when the underlying failure was connection-related
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::PoolExhausted => true,
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::TimedOut
            ),
            Self::Store { source, .. } => source.is_connection_error(),
            _ => false,
        }
    }

    /// The op name attached by the operation wrapper, when present
    pub fn op_name(&self) -> Option<&str> {
        match self {
            Self::Connection { op, .. } | Self::Store { op, .. } => Some(op),
            _ => None,
        }
    }
}
