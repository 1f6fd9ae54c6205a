//! Protocol error type.
//!
//! A single error struct with a [`ErrorKind`] discriminator. Invocation
//! errors carry the full response that caused them; header-value errors
//! carry the offending raw string.

use std::fmt;

use thiserror::Error;

use crate::message::MrcpResponse;

pub type MrcpResult<T> = Result<T, MrcpError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bytes on the wire do not form a message. Fatal for the connection.
    Framing,
    /// A header's typed value could not be resolved.
    HeaderValue,
    /// The server answered with a non-success status.
    Invocation,
    /// A well-formed message arrived where it was not expected.
    ProtocolViolation,
    Transport,
    ConnectionClosed,
    Timeout,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Framing => "framing",
            ErrorKind::HeaderValue => "header value",
            ErrorKind::Invocation => "invocation",
            ErrorKind::ProtocolViolation => "protocol violation",
            ErrorKind::Transport => "transport",
            ErrorKind::ConnectionClosed => "connection closed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct MrcpError {
    kind: ErrorKind,
    message: String,
    response: Option<Box<MrcpResponse>>,
    raw_value: Option<String>,
    #[source]
    source: Option<BoxError>,
}

impl MrcpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            response: None,
            raw_value: None,
            source: None,
        }
    }

    pub fn framing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Framing, message)
    }

    /// A header value that failed to parse.
    pub fn header_value(name: &str, raw: &str, reason: impl fmt::Display) -> Self {
        let mut error = Self::new(
            ErrorKind::HeaderValue,
            format!("illegal value for {name}: {raw:?} ({reason})"),
        );
        error.raw_value = Some(raw.to_string());
        error
    }

    /// A non-success response, displayed as
    /// `MRCPv2 Status Code: <code> [<description>]`.
    pub fn invocation(response: MrcpResponse) -> Self {
        let status = response.status_code();
        let message = format!(
            "MRCPv2 Status Code: {} [{}]",
            status.as_u16(),
            status.description().unwrap_or("null")
        );
        let mut error = Self::new(ErrorKind::Invocation, message);
        error.response = Some(Box::new(response));
        error
    }

    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProtocolViolation, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn connection_closed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionClosed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The response behind an invocation error.
    pub fn response(&self) -> Option<&MrcpResponse> {
        self.response.as_deref()
    }

    pub fn into_response(self) -> Option<MrcpResponse> {
        self.response.map(|response| *response)
    }

    /// The raw header text behind a header-value error.
    pub fn raw_value(&self) -> Option<&str> {
        self.raw_value.as_deref()
    }

    /// Whether the connection that produced this error is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Framing | ErrorKind::Transport | ErrorKind::ConnectionClosed
        )
    }
}

impl From<std::io::Error> for MrcpError {
    fn from(err: std::io::Error) -> Self {
        let message = format!("I/O error: {err}");
        Self::transport(message).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ChannelIdentifier;
    use mrcp_core::{RequestState, ResourceType, StatusCode};
    use std::error::Error as _;

    fn response(code: u16) -> MrcpResponse {
        let channel = ChannelIdentifier::new("32AECB23433801", ResourceType::SpeechSynth).unwrap();
        MrcpResponse::new(7, StatusCode::new(code), RequestState::Complete, &channel)
    }

    #[test]
    fn invocation_message_names_the_status() {
        let err = MrcpError::invocation(response(407));
        assert_eq!(err.kind(), ErrorKind::Invocation);
        assert_eq!(
            err.to_string(),
            "MRCPv2 Status Code: 407 [STATUS_OPERATION_FAILED]"
        );
        assert_eq!(err.response().map(|r| r.request_id()), Some(7));
    }

    #[test]
    fn invocation_with_unknown_status() {
        let err = MrcpError::invocation(response(999));
        assert_eq!(err.to_string(), "MRCPv2 Status Code: 999 [null]");
        let response = err.into_response().unwrap();
        assert_eq!(response.status_code(), StatusCode::new(999));
    }

    #[test]
    fn header_value_keeps_raw_string() {
        let err = MrcpError::header_value("Completion-Cause", "abc success", "bad code");
        assert_eq!(err.kind(), ErrorKind::HeaderValue);
        assert_eq!(err.raw_value(), Some("abc success"));
        assert!(err.to_string().contains("Completion-Cause"));
        assert!(err.response().is_none());
    }

    #[test]
    fn io_errors_become_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: MrcpError = io.into();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_fatal());
        assert!(err.source().is_some());
    }

    #[test]
    fn only_connection_level_kinds_are_fatal() {
        assert!(MrcpError::framing("x").is_fatal());
        assert!(!MrcpError::timeout("x").is_fatal());
        assert!(!MrcpError::protocol_violation("x").is_fatal());
    }
}
