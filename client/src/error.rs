//! Error types surfaced by the client

use shared::CodecError;
use std::time::Duration;

/// Failure to establish the relay connection. Recoverable by retrying with
/// different connection details; never raised once a session is running.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection refused by {0}; is the relay running?")]
    Refused(String),
    #[error("relay at {0} timed out after {1:?}")]
    TimedOut(String, Duration),
    #[error("invalid relay address: {0}")]
    InvalidAddress(String),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("codec error during handshake: {0}")]
    Codec(#[from] CodecError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Conditions that end a running session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("relay has stopped")]
    RelayClosed,
}
