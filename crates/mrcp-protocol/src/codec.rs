//! Text framing for MRCPv2 control messages.
//!
//! ```text
//! MRCP/2.0 <message-length> <method> <request-id>                 CRLF
//! MRCP/2.0 <message-length> <status> <request-id> <state>         CRLF
//! MRCP/2.0 <message-length> <event> <request-id> <state>          CRLF
//! Name:value                                                      CRLF
//! ...
//!                                                                 CRLF
//! <Content-Length bytes of body>
//! ```
//!
//! `message-length` counts every byte of the message, itself included.
//! Bare LF line endings are accepted on input; output always uses CRLF.
//!
//! A message has content exactly when it carries `Content-Length`. A
//! `Content-Type` without a length stays an ordinary header, and a
//! `Content-Length:0` without a type decodes to no content, so it is not
//! written back.

use bytes::{Buf, BufMut, BytesMut};
use mrcp_core::{EventName, MethodName, RequestState, StatusCode};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::DEFAULT_MAX_MESSAGE_SIZE;
use crate::error::{MrcpError, MrcpResult};
use crate::header::{CONTENT_LENGTH, CONTENT_TYPE, Header};
use crate::message::{Content, Headers, MrcpEvent, MrcpMessage, MrcpRequest, MrcpResponse};

pub const PROTOCOL_VERSION: &str = "MRCP/2.0";

const CRLF: &[u8] = b"\r\n";

/// Upper bound on what one short read reserves ahead of the body.
const RESERVE_CHUNK: usize = 64 * 1024;

/// Encodes a complete message, computing its `message-length`.
pub fn encode_message(message: &MrcpMessage) -> Vec<u8> {
    let mut buffer = BytesMut::new();
    write_message(message, &mut buffer);
    buffer.to_vec()
}

/// Decodes the first message in `data`, which must hold all of it.
pub fn decode_message(data: &[u8]) -> MrcpResult<MrcpMessage> {
    let mut buffer = BytesMut::from(data);
    MrcpCodec::new(usize::MAX)
        .decode_eof(&mut buffer)?
        .ok_or_else(|| MrcpError::framing("no message in input"))
}

/// `tokio_util` codec for [`MrcpMessage`].
#[derive(Debug, Clone)]
pub struct MrcpCodec {
    max_message_size: usize,
}

impl Default for MrcpCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_SIZE)
    }
}

impl MrcpCodec {
    pub fn new(max_message_size: usize) -> Self {
        Self { max_message_size }
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

impl Decoder for MrcpCodec {
    type Item = MrcpMessage;
    type Error = MrcpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Stray line breaks between messages are not part of either.
        let leading = src
            .iter()
            .take_while(|b| matches!(b, b'\r' | b'\n'))
            .count();
        src.advance(leading);

        let Some(head_len) = find_head_end(src) else {
            if src.len() > self.max_message_size {
                return Err(MrcpError::framing(format!(
                    "no header terminator within {} bytes",
                    self.max_message_size
                )));
            }
            return Ok(None);
        };

        let head = std::str::from_utf8(&src[..head_len])
            .map_err(|err| MrcpError::framing("message head is not UTF-8").with_source(err))?;
        let parsed = parse_head(head)?;

        let body_len = parsed.content_length.unwrap_or(0);
        let total = match head_len.checked_add(body_len) {
            Some(total) if total <= self.max_message_size => total,
            _ => {
                return Err(MrcpError::framing(format!(
                    "Content-Length {body_len} exceeds limit of {} bytes",
                    self.max_message_size
                )));
            }
        };
        if src.len() < total {
            src.reserve((total - src.len()).min(RESERVE_CHUNK));
            return Ok(None);
        }

        src.advance(head_len);
        let body = src.split_to(body_len).freeze();
        let content = match (parsed.content_length, parsed.content_type) {
            (Some(_), Some(content_type)) => Some(Content::new(content_type, body)),
            _ => None,
        };

        let message = parsed.start.into_message(parsed.headers, content);
        trace!(target: "mrcp_protocol::wire", bytes = total, "decoded {}", message.summary());
        Ok(Some(message))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.iter().all(u8::is_ascii_whitespace) => {
                src.clear();
                Ok(None)
            }
            None => Err(MrcpError::framing(format!(
                "stream ended inside a message ({} bytes buffered)",
                src.len()
            ))),
        }
    }
}

impl Encoder<MrcpMessage> for MrcpCodec {
    type Error = MrcpError;

    fn encode(&mut self, item: MrcpMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&MrcpMessage>>::encode(self, &item, dst)
    }
}

impl Encoder<&MrcpMessage> for MrcpCodec {
    type Error = MrcpError;

    fn encode(&mut self, item: &MrcpMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();
        write_message(item, dst);
        let written = dst.len() - start;
        if written > self.max_message_size {
            dst.truncate(start);
            return Err(MrcpError::framing(format!(
                "message of {written} bytes exceeds limit of {}",
                self.max_message_size
            )));
        }
        trace!(target: "mrcp_protocol::wire", bytes = written, "encoded {}", item.summary());
        Ok(())
    }
}

/// Offset just past the blank line ending the head.
fn find_head_end(src: &[u8]) -> Option<usize> {
    let mut line_start = 0;
    for (index, byte) in src.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        let line = &src[line_start..index];
        if line.is_empty() || line == b"\r" {
            return Some(index + 1);
        }
        line_start = index + 1;
    }
    None
}

enum StartLine {
    Request(MethodName, u64),
    Response(StatusCode, u64, RequestState),
    Event(EventName, u64, RequestState),
}

impl StartLine {
    fn into_message(self, headers: Headers, content: Option<Content>) -> MrcpMessage {
        match self {
            StartLine::Request(method, id) => {
                MrcpRequest::from_parts(method, id, headers, content).into()
            }
            StartLine::Response(status, id, state) => {
                MrcpResponse::from_parts(id, status, state, headers, content).into()
            }
            StartLine::Event(event, id, state) => {
                MrcpEvent::from_parts(event, id, state, headers, content).into()
            }
        }
    }
}

struct ParsedHead {
    start: StartLine,
    headers: Headers,
    content_type: Option<String>,
    content_length: Option<usize>,
}

fn parse_head(head: &str) -> MrcpResult<ParsedHead> {
    let mut lines = head.lines().filter(|line| !line.is_empty());
    let start_line = lines
        .next()
        .ok_or_else(|| MrcpError::framing("empty message head"))?;
    let start = parse_start_line(start_line)?;

    let mut headers = Headers::new();
    let mut content_length = None;

    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| MrcpError::framing(format!("header line without ':': {line:?}")))?;
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() {
            return Err(MrcpError::framing(format!("header line without name: {line:?}")));
        }

        if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
            let length = value.parse::<usize>().map_err(|err| {
                MrcpError::framing(format!("invalid Content-Length {value:?}")).with_source(err)
            })?;
            content_length = Some(length);
        } else {
            headers.push(Header::new(name, value));
        }
    }

    let content_type = match content_length {
        Some(_) => headers
            .remove(CONTENT_TYPE)
            .map(|header| header.raw_value().to_string()),
        None => None,
    };
    if content_length.is_some_and(|length| length > 0) && content_type.is_none() {
        return Err(MrcpError::framing("message body without Content-Type"));
    }

    Ok(ParsedHead {
        start,
        headers,
        content_type,
        content_length,
    })
}

fn parse_start_line(line: &str) -> MrcpResult<StartLine> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let invalid = || MrcpError::framing(format!("invalid start-line {line:?}"));

    let version = tokens.first().ok_or_else(invalid)?;
    if *version != PROTOCOL_VERSION {
        return Err(MrcpError::framing(format!(
            "unsupported protocol version {version:?}"
        )));
    }
    if tokens.len() < 2 || tokens[1].parse::<u64>().is_err() {
        return Err(invalid());
    }

    let request_id = |token: &str| token.parse::<u64>().map_err(|_| invalid());
    let state = |token: &str| {
        token
            .parse::<RequestState>()
            .map_err(|err| invalid().with_source(err))
    };

    match tokens.as_slice() {
        [_, _, method, id] => {
            let method = method
                .parse::<MethodName>()
                .map_err(|err| invalid().with_source(err))?;
            Ok(StartLine::Request(method, request_id(id)?))
        }
        [_, _, third, id, request_state] if is_status_code(third) => {
            let status = third.parse::<u16>().map_err(|_| invalid())?;
            Ok(StartLine::Response(
                StatusCode::new(status),
                request_id(id)?,
                state(request_state)?,
            ))
        }
        [_, _, event, id, request_state] => {
            let event = event
                .parse::<EventName>()
                .map_err(|err| invalid().with_source(err))?;
            Ok(StartLine::Event(event, request_id(id)?, state(request_state)?))
        }
        _ => Err(invalid()),
    }
}

fn is_status_code(token: &str) -> bool {
    token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit())
}

fn start_line_tail(message: &MrcpMessage) -> String {
    match message {
        MrcpMessage::Request(m) => format!("{} {}", m.method(), m.request_id()),
        MrcpMessage::Response(m) => format!(
            "{} {} {}",
            m.status_code(),
            m.request_id(),
            m.request_state()
        ),
        MrcpMessage::Event(m) => format!(
            "{} {} {}",
            m.event_name(),
            m.request_id(),
            m.request_state()
        ),
    }
}

fn digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

/// Smallest total length that is consistent with its own digit count.
fn message_length(fixed: usize) -> usize {
    let mut total = fixed + 1;
    loop {
        let candidate = fixed + digits(total);
        if candidate == total {
            return total;
        }
        total = candidate;
    }
}

fn write_message(message: &MrcpMessage, dst: &mut BytesMut) {
    let tail = start_line_tail(message);

    let mut rest = BytesMut::new();
    for header in message.headers() {
        rest.put_slice(header.name().as_bytes());
        rest.put_u8(b':');
        rest.put_slice(header.raw_value().as_bytes());
        rest.put_slice(CRLF);
    }
    if let Some(content) = message.content() {
        rest.put_slice(format!("{CONTENT_TYPE}:{}", content.content_type).as_bytes());
        rest.put_slice(CRLF);
        rest.put_slice(format!("{CONTENT_LENGTH}:{}", content.len()).as_bytes());
        rest.put_slice(CRLF);
    }
    rest.put_slice(CRLF);
    if let Some(content) = message.content() {
        rest.put_slice(&content.body);
    }

    // "MRCP/2.0 " + length + " " + tail + CRLF
    let fixed = PROTOCOL_VERSION.len() + 1 + 1 + tail.len() + CRLF.len() + rest.len();
    let total = message_length(fixed);

    dst.reserve(total);
    dst.put_slice(format!("{PROTOCOL_VERSION} {total} {tail}").as_bytes());
    dst.put_slice(CRLF);
    dst.put_slice(&rest);
}
