use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    EmptyHost(String),
    BadPort(String),
    PartialCredentials(String),
    BadTimeout(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::EmptyHost(e) => write!(f, "Host configuration error: {}", e),
            ConfigError::BadPort(e) => write!(f, "Port configuration error: {}", e),
            ConfigError::PartialCredentials(e) => write!(f, "Credentials error: {}", e),
            ConfigError::BadTimeout(e) => write!(f, "Timeout configuration error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Network-level failures raised by the low-level request executor.
///
/// Each variant keeps the originating error so callers can still distinguish
/// e.g. a connection reset from a timeout after the instrumentation layer has
/// passed it through untouched.
#[derive(Debug)]
pub enum TransportError {
    DnsError(std::io::Error),
    ConnectError(std::io::Error),
    IoError(std::io::Error),
    Timeout { phase: &'static str, limit: Duration },
    MalformedResponse(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::DnsError(e) => write!(f, "DNS lookup failed: {}", e),
            TransportError::ConnectError(e) => write!(f, "Connect failed: {}", e),
            TransportError::IoError(e) => write!(f, "Socket IO error: {}", e),
            TransportError::Timeout { phase, limit } => {
                write!(f, "Timed out during {} after {:?}", phase, limit)
            }
            TransportError::MalformedResponse(e) => write!(f, "Malformed HTTP response: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

/// Failures surfaced by the operation layer.
///
/// `Transport` wraps the untouched network error; `UnexpectedStatus` is a
/// post-check failure on an otherwise completed attempt. The two are distinct
/// variants so a test script can tell "the network failed" apart from "the
/// server answered with the wrong code" structurally.
#[derive(Debug)]
pub enum ActionError {
    Transport(TransportError),
    UnexpectedStatus {
        expected: &'static [u16],
        actual: u16,
    },
    NoActiveSession(String),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Transport(e) => write!(f, "Transport error: {}", e),
            ActionError::UnexpectedStatus { expected, actual } => {
                write!(
                    f,
                    "Unexpected status code {} (expected one of {:?})",
                    actual, expected
                )
            }
            ActionError::NoActiveSession(id) => {
                write!(f, "No active action registered for session '{}'", id)
            }
        }
    }
}

impl std::error::Error for ActionError {}

impl From<TransportError> for ActionError {
    fn from(err: TransportError) -> Self {
        ActionError::Transport(err)
    }
}
