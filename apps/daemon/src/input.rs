//! Line protocol read from stdin by `smsreply run`.

use crossbeam_channel::{unbounded, Receiver};
use smsreply_monitor::PhoneStateEvent;
use smsreply_service::ServiceAction;
use std::io::BufRead;
use std::thread;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCommand {
    Phone(PhoneStateEvent),
    Service(ServiceAction),
    /// Open-main-interface action from the status surface.
    Open,
    BootCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("unexpected argument for {command}: {argument}")]
    UnexpectedArgument { command: String, argument: String },
}

pub fn parse_line(line: &str) -> Result<DaemonCommand, ParseError> {
    let mut words = line.split_whitespace();
    let command = words.next().ok_or(ParseError::Empty)?.to_ascii_lowercase();
    let argument = words.next();

    if command == "ringing" {
        if let Some(extra) = words.next() {
            return Err(ParseError::UnexpectedArgument {
                command,
                argument: extra.to_string(),
            });
        }
        return Ok(DaemonCommand::Phone(PhoneStateEvent::ringing(argument)));
    }

    if let Some(argument) = argument {
        return Err(ParseError::UnexpectedArgument {
            command,
            argument: argument.to_string(),
        });
    }

    match command.as_str() {
        "offhook" | "off_hook" => Ok(DaemonCommand::Phone(PhoneStateEvent::offhook())),
        "idle" => Ok(DaemonCommand::Phone(PhoneStateEvent::idle())),
        "open" => Ok(DaemonCommand::Open),
        "boot" => Ok(DaemonCommand::BootCompleted),
        other => other
            .parse::<ServiceAction>()
            .map(DaemonCommand::Service)
            .map_err(|_| ParseError::Unknown(other.to_string())),
    }
}

/// Forward stdin lines to a channel. The channel disconnects at EOF.
pub fn spawn_stdin_reader() -> std::io::Result<Receiver<String>> {
    let (tx, rx) = unbounded();

    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read stdin");
                        break;
                    }
                }
            }
            tracing::debug!("stdin closed");
        })?;

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsreply_monitor::PhoneState;

    #[test]
    fn test_parse_ringing_with_number() {
        let cmd = parse_line("ringing +15551234567").unwrap();
        match cmd {
            DaemonCommand::Phone(event) => {
                assert_eq!(event.state, PhoneState::Ringing);
                assert_eq!(event.number.as_deref(), Some("+15551234567"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ringing_without_number() {
        let cmd = parse_line("RINGING").unwrap();
        assert_eq!(cmd, DaemonCommand::Phone(PhoneStateEvent::ringing(None)));
    }

    #[test]
    fn test_parse_telephony_states() {
        assert_eq!(
            parse_line("offhook").unwrap(),
            DaemonCommand::Phone(PhoneStateEvent::offhook())
        );
        assert_eq!(
            parse_line("  idle  ").unwrap(),
            DaemonCommand::Phone(PhoneStateEvent::idle())
        );
    }

    #[test]
    fn test_parse_service_actions() {
        assert_eq!(
            parse_line("start").unwrap(),
            DaemonCommand::Service(ServiceAction::Start)
        );
        assert_eq!(
            parse_line("stop").unwrap(),
            DaemonCommand::Service(ServiceAction::Stop)
        );
        assert_eq!(
            parse_line("dismiss").unwrap(),
            DaemonCommand::Service(ServiceAction::Dismissed)
        );
        assert_eq!(parse_line("open").unwrap(), DaemonCommand::Open);
        assert_eq!(parse_line("boot").unwrap(), DaemonCommand::BootCompleted);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("   "), Err(ParseError::Empty));
        assert_eq!(parse_line("pause"), Err(ParseError::Unknown("pause".into())));
        assert!(matches!(
            parse_line("idle now"),
            Err(ParseError::UnexpectedArgument { .. })
        ));
    }

    #[test]
    fn test_parse_ringing_rejects_split_number() {
        assert_eq!(
            parse_line("ringing +1 555 1234567"),
            Err(ParseError::UnexpectedArgument {
                command: "ringing".into(),
                argument: "555".into(),
            })
        );
    }
}
