//! Server error types.

use std::io;

use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] mrcp_protocol::MrcpError),

    /// The channel string is not `<channel-id>@<resource-type>`.
    #[error("Invalid channel identifier {value:?}: {reason}")]
    InvalidChannel { value: String, reason: String },

    /// The handler set serves a different resource type than the channel.
    #[error("Handlers for {handlers} cannot serve channel {channel}")]
    ResourceMismatch { channel: String, handlers: String },

    #[error("Channel already open: {channel}")]
    ChannelInUse { channel: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_channel(value: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidChannel {
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
