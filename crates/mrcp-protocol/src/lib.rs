//! MRCPv2 wire protocol: messages, headers, framing and connections.
//!
//! Messages are text framed:
//! - a start-line naming the protocol version, total length and role
//! - `Name:value` header lines, then a blank line
//! - an optional body of `Content-Length` bytes
//!
//! # Example
//!
//! ```rust
//! use mrcp_core::{MethodName, ResourceType};
//! use mrcp_protocol::{ChannelIdentifier, MrcpMessage, MrcpRequest, decode_message, encode_message};
//!
//! let channel = ChannelIdentifier::new("32AECB23433801", ResourceType::SpeechSynth).unwrap();
//! let request = MrcpMessage::from(MrcpRequest::new(MethodName::Speak, &channel));
//! let bytes = encode_message(&request);
//! assert_eq!(decode_message(&bytes).unwrap(), request);
//! ```

pub mod codec;
pub mod connection;
mod error;
pub mod header;
mod message;
pub mod registry;

pub use codec::{MrcpCodec, PROTOCOL_VERSION, decode_message, encode_message};
pub use connection::{
    ChannelSink, ChannelTable, ConnectionConfig, ConnectionHandle, MrcpConnection, Unrouted,
    UnroutedHook,
};
pub use error::{ErrorKind, MrcpError, MrcpResult};
pub use header::{ChannelIdentifier, CompletionCause, Header, HeaderValue, IllegalValue};
pub use message::{Content, Headers, MrcpEvent, MrcpMessage, MrcpRequest, MrcpResponse};

/// Default upper bound on one encoded message (1 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;
