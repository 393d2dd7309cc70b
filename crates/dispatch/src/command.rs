//! Transport that hands each message part to an external program.
//!
//! The program receives the destination number through its arguments (every
//! `{number}` is substituted) and the part text on stdin, e.g.
//! `sms-send --to {number}`. A non-zero exit status is a failed send.

use crate::error::TransportError;
use crate::{PermissionChecker, SmsTransport};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Placeholder replaced by the destination number in program arguments.
pub const NUMBER_PLACEHOLDER: &str = "{number}";

#[derive(Debug, Clone)]
pub struct CommandTransport {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTransport {
    /// With no arguments the number is passed as the only argument.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let args = if args.is_empty() {
            vec![NUMBER_PLACEHOLDER.to_string()]
        } else {
            args
        };
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn args_for(&self, number: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(NUMBER_PLACEHOLDER, number))
            .collect()
    }

    fn run(&self, number: &str, text: &str) -> Result<(), TransportError> {
        let mut child = Command::new(&self.program)
            .args(self.args_for(number))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TransportError::Unavailable(format!(
                    "failed to execute {}: {e}",
                    self.program.display()
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A program that exits without reading stdin closes the pipe;
            // its exit status is what decides the outcome.
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransportError::Failed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl SmsTransport for CommandTransport {
    fn send_text(&self, number: &str, text: &str) -> Result<(), TransportError> {
        self.run(number, text)
    }

    fn send_multipart(&self, number: &str, parts: &[String]) -> Result<(), TransportError> {
        for (index, part) in parts.iter().enumerate() {
            self.run(number, part).inspect_err(|_| {
                tracing::debug!(index, total = parts.len(), "multipart send interrupted");
            })?;
        }
        Ok(())
    }
}

/// Grants sending only when the program can be resolved.
#[derive(Debug, Clone)]
pub struct ProgramPermission {
    program: PathBuf,
}

impl ProgramPermission {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PermissionChecker for ProgramPermission {
    fn can_send_sms(&self) -> bool {
        if self.program.components().count() > 1 {
            return self.program.is_file();
        }
        which::which(&self.program).is_ok()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_number() {
        let transport = CommandTransport::new("sms-send", vec!["--to".into(), "{number}".into()]);
        assert_eq!(transport.args_for("+15551234567"), vec!["--to", "+15551234567"]);
    }

    #[test]
    fn test_default_args_are_number_only() {
        let transport = CommandTransport::new("sms-send", Vec::new());
        assert_eq!(transport.args_for("+1555"), vec!["+1555"]);
    }

    #[test]
    fn test_successful_program() {
        let transport = CommandTransport::new("true", Vec::new());
        assert!(transport.send_text("+1555", "hello").is_ok());
        assert!(transport
            .send_multipart("+1555", &["a".to_string(), "b".to_string()])
            .is_ok());
    }

    #[test]
    fn test_failing_program() {
        let transport = CommandTransport::new("false", Vec::new());
        assert!(matches!(
            transport.send_text("+1555", "hello"),
            Err(TransportError::Failed(_))
        ));
    }

    #[test]
    fn test_missing_program() {
        let transport = CommandTransport::new("smsreply-no-such-program", Vec::new());
        assert!(matches!(
            transport.send_text("+1555", "hello"),
            Err(TransportError::Unavailable(_))
        ));
        assert!(!ProgramPermission::new("smsreply-no-such-program").can_send_sms());
    }

    #[test]
    fn test_permission_for_program_on_path() {
        assert!(ProgramPermission::new("sh").can_send_sms());
    }
}
