//! MRCPv2 messages: requests, responses and events.
//!
//! All three share a header list, an optional body and a request-id; the
//! start-line is what tells them apart. `Content-Length` and `Content-Type`
//! never appear in the header list, they are derived from [`Content`].

use std::fmt;

use bytes::Bytes;
use mrcp_core::{EventName, MethodName, RequestState, StatusCode};

use crate::error::{MrcpError, MrcpResult};
use crate::header::{self, ChannelIdentifier, Header, HeaderValue};

/// A typed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub content_type: String,
    pub body: Bytes,
}

impl Content {
    pub fn new(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// The body as UTF-8 text, if it is.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Ordered header list. Names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers(Vec<Header>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Header> {
        self.0.iter().find(|header| header.has_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces the value of an existing header of the same name in place,
    /// keeping its spelling, or appends.
    pub fn set(&mut self, header: Header) {
        match self.0.iter_mut().find(|existing| existing.has_name(header.name())) {
            Some(existing) => *existing = header.renamed(existing.name()),
            None => self.0.push(header),
        }
    }

    /// Appends without checking for duplicates.
    pub fn push(&mut self, header: Header) {
        self.0.push(header);
    }

    pub fn remove(&mut self, name: &str) -> Option<Header> {
        let index = self.0.iter().position(|header| header.has_name(name))?;
        Some(self.0.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn channel_identifier_of(headers: &Headers) -> MrcpResult<ChannelIdentifier> {
    let header = headers.get(header::CHANNEL_IDENTIFIER).ok_or_else(|| {
        MrcpError::protocol_violation("message has no Channel-Identifier header")
    })?;
    match header.value()? {
        HeaderValue::ChannelIdentifier(id) => Ok(id.clone()),
        other => Err(MrcpError::header_value(
            header.name(),
            header.raw_value(),
            format!("resolved to {other:?}"),
        )),
    }
}

/// Accessors shared by the three message kinds.
macro_rules! message_common {
    ($ty:ty) => {
        impl $ty {
            pub fn request_id(&self) -> u64 {
                self.request_id
            }

            pub fn headers(&self) -> &Headers {
                &self.headers
            }

            pub fn headers_mut(&mut self) -> &mut Headers {
                &mut self.headers
            }

            pub fn header(&self, name: &str) -> Option<&Header> {
                self.headers.get(name)
            }

            /// Sets a header from wire text, replacing any previous value.
            pub fn set_header(&mut self, name: impl Into<String>, raw: impl Into<String>) {
                self.headers.set(Header::new(name, raw));
            }

            pub fn set_typed_header(&mut self, name: impl Into<String>, value: HeaderValue) {
                self.headers.set(Header::typed(name, value));
            }

            #[must_use]
            pub fn with_header(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
                self.set_header(name, raw);
                self
            }

            pub fn content(&self) -> Option<&Content> {
                self.content.as_ref()
            }

            pub fn set_content(&mut self, content: Option<Content>) {
                self.content = content;
            }

            #[must_use]
            pub fn with_content(mut self, content: Content) -> Self {
                self.content = Some(content);
                self
            }

            /// The resolved `Channel-Identifier` header.
            pub fn channel_identifier(&self) -> MrcpResult<ChannelIdentifier> {
                channel_identifier_of(&self.headers)
            }

            fn stamp_channel(&mut self, channel: &ChannelIdentifier) {
                self.headers.set(Header::typed(
                    header::CHANNEL_IDENTIFIER,
                    HeaderValue::ChannelIdentifier(channel.clone()),
                ));
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct MrcpRequest {
    method: MethodName,
    request_id: u64,
    headers: Headers,
    content: Option<Content>,
}

impl MrcpRequest {
    /// A request on `channel`. The request-id is assigned when it is sent.
    pub fn new(method: MethodName, channel: &ChannelIdentifier) -> Self {
        let mut request = Self::from_parts(method, 0, Headers::new(), None);
        request.stamp_channel(channel);
        request
    }

    pub fn from_parts(
        method: MethodName,
        request_id: u64,
        headers: Headers,
        content: Option<Content>,
    ) -> Self {
        Self {
            method,
            request_id,
            headers,
            content,
        }
    }

    pub fn method(&self) -> MethodName {
        self.method
    }

    pub fn set_request_id(&mut self, request_id: u64) {
        self.request_id = request_id;
    }
}

message_common!(MrcpRequest);

#[derive(Debug, Clone, PartialEq)]
pub struct MrcpResponse {
    request_id: u64,
    status_code: StatusCode,
    request_state: RequestState,
    headers: Headers,
    content: Option<Content>,
}

impl MrcpResponse {
    pub fn new(
        request_id: u64,
        status_code: StatusCode,
        request_state: RequestState,
        channel: &ChannelIdentifier,
    ) -> Self {
        let mut response =
            Self::from_parts(request_id, status_code, request_state, Headers::new(), None);
        response.stamp_channel(channel);
        response
    }

    pub fn from_parts(
        request_id: u64,
        status_code: StatusCode,
        request_state: RequestState,
        headers: Headers,
        content: Option<Content>,
    ) -> Self {
        Self {
            request_id,
            status_code,
            request_state,
            headers,
            content,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn request_state(&self) -> RequestState {
        self.request_state
    }

    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    pub fn set_request_id(&mut self, request_id: u64) {
        self.request_id = request_id;
    }

    pub fn set_status_code(&mut self, status_code: StatusCode) {
        self.status_code = status_code;
    }

    pub fn set_request_state(&mut self, request_state: RequestState) {
        self.request_state = request_state;
    }

    /// Turns a non-success response into an invocation error.
    pub fn into_result(self) -> MrcpResult<MrcpResponse> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(MrcpError::invocation(self))
        }
    }
}

message_common!(MrcpResponse);

#[derive(Debug, Clone, PartialEq)]
pub struct MrcpEvent {
    event_name: EventName,
    request_id: u64,
    request_state: RequestState,
    headers: Headers,
    content: Option<Content>,
}

impl MrcpEvent {
    pub fn new(
        event_name: EventName,
        request_id: u64,
        request_state: RequestState,
        channel: &ChannelIdentifier,
    ) -> Self {
        let mut event = Self::from_parts(event_name, request_id, request_state, Headers::new(), None);
        event.stamp_channel(channel);
        event
    }

    pub fn from_parts(
        event_name: EventName,
        request_id: u64,
        request_state: RequestState,
        headers: Headers,
        content: Option<Content>,
    ) -> Self {
        Self {
            event_name,
            request_id,
            request_state,
            headers,
            content,
        }
    }

    pub fn event_name(&self) -> EventName {
        self.event_name
    }

    pub fn request_state(&self) -> RequestState {
        self.request_state
    }

    pub fn set_request_state(&mut self, request_state: RequestState) {
        self.request_state = request_state;
    }
}

message_common!(MrcpEvent);

/// Any message that can travel on a control connection.
#[derive(Debug, Clone, PartialEq)]
pub enum MrcpMessage {
    Request(MrcpRequest),
    Response(MrcpResponse),
    Event(MrcpEvent),
}

impl MrcpMessage {
    pub fn request_id(&self) -> u64 {
        match self {
            MrcpMessage::Request(m) => m.request_id(),
            MrcpMessage::Response(m) => m.request_id(),
            MrcpMessage::Event(m) => m.request_id(),
        }
    }

    pub fn headers(&self) -> &Headers {
        match self {
            MrcpMessage::Request(m) => m.headers(),
            MrcpMessage::Response(m) => m.headers(),
            MrcpMessage::Event(m) => m.headers(),
        }
    }

    pub fn content(&self) -> Option<&Content> {
        match self {
            MrcpMessage::Request(m) => m.content(),
            MrcpMessage::Response(m) => m.content(),
            MrcpMessage::Event(m) => m.content(),
        }
    }

    /// `None` for requests.
    pub fn request_state(&self) -> Option<RequestState> {
        match self {
            MrcpMessage::Request(_) => None,
            MrcpMessage::Response(m) => Some(m.request_state()),
            MrcpMessage::Event(m) => Some(m.request_state()),
        }
    }

    pub fn channel_identifier(&self) -> MrcpResult<ChannelIdentifier> {
        channel_identifier_of(self.headers())
    }

    /// Short description for logs, e.g. `response 200 COMPLETE`.
    pub fn summary(&self) -> String {
        match self {
            MrcpMessage::Request(m) => format!("request {} #{}", m.method(), m.request_id()),
            MrcpMessage::Response(m) => format!(
                "response {} {} #{}",
                m.status_code(),
                m.request_state(),
                m.request_id()
            ),
            MrcpMessage::Event(m) => format!(
                "event {} {} #{}",
                m.event_name(),
                m.request_state(),
                m.request_id()
            ),
        }
    }
}

impl From<MrcpRequest> for MrcpMessage {
    fn from(request: MrcpRequest) -> Self {
        MrcpMessage::Request(request)
    }
}

impl From<MrcpResponse> for MrcpMessage {
    fn from(response: MrcpResponse) -> Self {
        MrcpMessage::Response(response)
    }
}

impl From<MrcpEvent> for MrcpMessage {
    fn from(event: MrcpEvent) -> Self {
        MrcpMessage::Event(event)
    }
}

impl fmt::Display for MrcpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
