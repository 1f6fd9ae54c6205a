//! Errors reported by the `mrcp` command-line tool.

use std::fmt;

use mrcp_protocol::MrcpError;
use mrcp_server::ServerError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Bad command-line input.
    Usage(String),
    /// IO error.
    Io(std::io::Error),
    /// Connection, framing or request failure.
    Mrcp(MrcpError),
    /// The demo server failed.
    Server(ServerError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Usage(msg) => write!(f, "invalid arguments: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Mrcp(err) => write!(f, "{} error: {}", err.kind(), err),
            Self::Server(err) => write!(f, "server error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Mrcp(err) => Some(err),
            Self::Server(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<MrcpError> for ClientError {
    fn from(err: MrcpError) -> Self {
        Self::Mrcp(err)
    }
}

impl From<ServerError> for ClientError {
    fn from(err: ServerError) -> Self {
        Self::Server(err)
    }
}
