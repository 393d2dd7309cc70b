//! Outbound SMS dispatch for smsreply.
//!
//! [`SmsDispatcher`] checks permission and arguments, splits the message into
//! segments and makes exactly one send attempt through an [`SmsTransport`].
//! There is no retry: a failed send is reported to the caller and dropped.
//!
//! # Example
//!
//! ```ignore
//! use smsreply_dispatch::{CommandTransport, ProgramPermission, SmsDispatch, SmsDispatcher};
//!
//! let dispatcher = SmsDispatcher::new(
//!     CommandTransport::new("sms-send", vec!["--to".into(), "{number}".into()]),
//!     ProgramPermission::new("sms-send"),
//! );
//! dispatcher.send("+15551234567", "Busy, will call back")?;
//! ```

mod command;
mod error;
mod segment;

use std::sync::{Arc, Mutex};

pub use command::{CommandTransport, ProgramPermission, NUMBER_PLACEHOLDER};
pub use error::{DispatchError, TransportError};
pub use segment::{
    divide_message, encoding_for, Encoding, GSM7_PART_LIMIT, GSM7_SINGLE_LIMIT, UCS2_PART_LIMIT,
    UCS2_SINGLE_LIMIT,
};

/// Sends a text message to a phone number.
pub trait SmsDispatch: Send + Sync {
    fn send(&self, number: &str, message: &str) -> Result<DispatchReport, DispatchError>;
}

impl<T: SmsDispatch + ?Sized> SmsDispatch for Arc<T> {
    fn send(&self, number: &str, message: &str) -> Result<DispatchReport, DispatchError> {
        (**self).send(number, message)
    }
}

/// Outcome of a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of segments the message was sent as.
    pub parts: usize,
}

/// Platform channel that actually delivers messages.
pub trait SmsTransport: Send + Sync {
    fn send_text(&self, number: &str, text: &str) -> Result<(), TransportError>;

    /// Send an ordered multi-part message. Delivery order is the
    /// transport's responsibility.
    fn send_multipart(&self, number: &str, parts: &[String]) -> Result<(), TransportError>;
}

/// Check for authorization to send SMS.
pub trait PermissionChecker: Send + Sync {
    fn can_send_sms(&self) -> bool;
}

/// Fixed permission answer, for hosts without a runtime permission model.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub bool);

impl PermissionChecker for StaticPermission {
    fn can_send_sms(&self) -> bool {
        self.0
    }
}

pub struct SmsDispatcher<T, P> {
    transport: T,
    permission: P,
}

impl<T, P> SmsDispatcher<T, P>
where
    T: SmsTransport,
    P: PermissionChecker,
{
    pub fn new(transport: T, permission: P) -> Self {
        Self {
            transport,
            permission,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T, P> SmsDispatch for SmsDispatcher<T, P>
where
    T: SmsTransport,
    P: PermissionChecker,
{
    fn send(&self, number: &str, message: &str) -> Result<DispatchReport, DispatchError> {
        if !self.permission.can_send_sms() {
            tracing::error!("SMS permission not granted");
            return Err(DispatchError::PermissionDenied);
        }

        if number.trim().is_empty() {
            tracing::error!("refusing to send SMS to a blank number");
            return Err(DispatchError::InvalidInput("blank phone number"));
        }
        if message.trim().is_empty() {
            tracing::error!(number, "refusing to send a blank SMS");
            return Err(DispatchError::InvalidInput("blank message"));
        }

        let parts = divide_message(message);
        let result = if parts.len() > 1 {
            self.transport.send_multipart(number, &parts)
        } else {
            self.transport.send_text(number, message)
        };

        match result {
            Ok(()) => {
                tracing::info!(number, parts = parts.len(), "SMS sent");
                Ok(DispatchReport { parts: parts.len() })
            }
            Err(e) => {
                tracing::error!(number, error = %e, "failed to send SMS");
                Err(e.into())
            }
        }
    }
}

/// A message handed to a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub number: String,
    pub parts: Vec<String>,
}

/// Transport that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    failure: Mutex<Option<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock().unwrap_or_else(|p| p.into_inner()) = Some(reason.into());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn record(&self, number: &str, parts: Vec<String>) -> Result<(), TransportError> {
        if let Some(reason) = self.failure.lock().unwrap_or_else(|p| p.into_inner()).clone() {
            return Err(TransportError::Failed(reason));
        }
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(SentMessage {
                number: number.to_string(),
                parts,
            });
        Ok(())
    }
}

impl SmsTransport for RecordingTransport {
    fn send_text(&self, number: &str, text: &str) -> Result<(), TransportError> {
        self.record(number, vec![text.to_string()])
    }

    fn send_multipart(&self, number: &str, parts: &[String]) -> Result<(), TransportError> {
        self.record(number, parts.to_vec())
    }
}

impl<T: SmsTransport + ?Sized> SmsTransport for Arc<T> {
    fn send_text(&self, number: &str, text: &str) -> Result<(), TransportError> {
        (**self).send_text(number, text)
    }

    fn send_multipart(&self, number: &str, parts: &[String]) -> Result<(), TransportError> {
        (**self).send_multipart(number, parts)
    }
}
