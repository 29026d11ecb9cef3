//! # Client Error Taxonomy
//!
//! Purpose: Separate failures that invalidate a connection from failures that
//! only concern a single call.
//!
//! Fatal to the connection: `Transport`, `Decode`, `Timeout`. After one of
//! these the connection is poisoned and every further operation returns
//! `ConnectionPoisoned`; the caller must reconnect.
//!
//! Per-call only: `Server`, `TypeMismatch`, `TransactionAborted`,
//! `InvalidState`. The connection stays usable.

use redwire_proto::{DecodeError, ServerError};
use thiserror::Error;

/// Result type for all client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum Error {
    /// Network or IO failure while connecting, reading, or writing.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    /// Malformed reply framing; the byte stream may be desynchronized.
    #[error("protocol decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Well-formed error reply from the server.
    #[error("server error: {0}")]
    Server(ServerError),
    /// A decoded reply does not fit the requested target type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Target type or shape the caller asked for.
        expected: &'static str,
        /// Shape (and detail) of the reply that arrived.
        actual: String,
    },
    /// EXEC returned Null: a watched key changed and nothing was applied.
    #[error("transaction aborted by the server")]
    TransactionAborted,
    /// The connection was invalidated by an earlier fatal error.
    #[error("connection unusable after an earlier fatal error")]
    ConnectionPoisoned,
    /// The operation is not valid in the connection's current mode.
    #[error("invalid operation for connection state: {0}")]
    InvalidState(&'static str),
    /// A configured timeout elapsed while waiting on the transport.
    #[error("operation timed out")]
    Timeout,
}

impl From<ServerError> for Error {
    fn from(err: ServerError) -> Self {
        Error::Server(err)
    }
}

impl Error {
    /// True when the error invalidates the connection it occurred on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Decode(_) | Error::Timeout | Error::ConnectionPoisoned
        )
    }
}
