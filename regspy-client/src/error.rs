use std::{error::Error, fmt::Display, io};

use regspy_protocol::error::ProtocolError;

/// Errors of a [`crate::Session`].
#[derive(Debug)]
pub enum SessionError {
    Protocol(ProtocolError),
    /// The requested target is not among the targets listed by the server.
    UnknownTarget { name: String, available: Vec<String> },
    /// The server did not report a current target.
    NoCurrentTarget,
    /// A command printed output where none was expected.
    CommandFailed { command: String, output: Vec<String> },
    /// The session was closed after an earlier fatal error.
    Closed,
}

impl From<ProtocolError> for SessionError {
    fn from(value: ProtocolError) -> Self {
        SessionError::Protocol(value)
    }
}

impl From<io::Error> for SessionError {
    fn from(value: io::Error) -> Self {
        SessionError::Protocol(ProtocolError::IoError(value))
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Protocol(error) => write!(f, "{}", error),
            SessionError::UnknownTarget { name, available } => write!(
                f,
                "Target '{}' not found, available targets: {}",
                name,
                available.join(", ")
            ),
            SessionError::NoCurrentTarget => write!(f, "The server has no current target"),
            SessionError::CommandFailed { command, output } => {
                write!(f, "'{}' failed: {}", command, output.join(" "))
            }
            SessionError::Closed => write!(f, "Session is closed"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Protocol(error) => Some(error),
            _ => None,
        }
    }
}
