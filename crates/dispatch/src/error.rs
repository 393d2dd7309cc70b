//! Error types for SMS dispatch.

use thiserror::Error;

/// Errors raised by an [`SmsTransport`](crate::SmsTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport could not be reached or started.
    #[error("sms transport unavailable: {0}")]
    Unavailable(String),

    /// The transport ran but reported a failure.
    #[error("sms transport failed: {0}")]
    Failed(String),

    #[error("sms transport io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while dispatching a message.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Sending SMS is not authorized.
    #[error("sms permission not granted")]
    PermissionDenied,

    /// Number or message was blank.
    #[error("invalid sms parameters: {0}")]
    InvalidInput(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
