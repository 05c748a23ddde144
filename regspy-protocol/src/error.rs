use std::{
    error::Error,
    fmt::Display,
    io::{self},
    num::ParseIntError,
    str::Utf8Error,
};

/// Errors that break the command/response contract with the server.
/// Any of these leaves the session in an unknown state; it must be closed.
#[derive(Debug)]
pub enum ProtocolError {
    IoError(io::Error),
    /// The first response line did not repeat the command that was sent.
    EchoMismatch { expected: String, got: String },
    MalformedLine(String),
    UnknownTargetState(String),
    /// The server closed the connection.
    UnexpectedEof,
    InvalidFormat(String),
}

impl From<io::Error> for ProtocolError {
    fn from(value: io::Error) -> Self {
        ProtocolError::IoError(value)
    }
}

impl From<Utf8Error> for ProtocolError {
    fn from(value: Utf8Error) -> Self {
        ProtocolError::InvalidFormat(format!("Invalid UTF8: {}", value))
    }
}

impl From<ParseIntError> for ProtocolError {
    fn from(value: ParseIntError) -> Self {
        ProtocolError::InvalidFormat(format!("Invalid integer: {}", value))
    }
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::IoError(error) => write!(f, "{}", error),
            ProtocolError::EchoMismatch { expected, got } => {
                write!(f, "Command echo mismatch: sent '{}', got '{}'", expected, got)
            }
            ProtocolError::MalformedLine(line) => write!(f, "Could not parse response '{}'", line),
            ProtocolError::UnknownTargetState(state) => {
                write!(f, "Unknown target state '{}'", state)
            }
            ProtocolError::UnexpectedEof => write!(f, "Connection closed by the server"),
            ProtocolError::InvalidFormat(format) => write!(f, "{}", format),
        }
    }
}

impl Error for ProtocolError {}
