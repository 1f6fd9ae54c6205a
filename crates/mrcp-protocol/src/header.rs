//! Message headers and their typed values.

use std::fmt;
use std::sync::OnceLock;

use mrcp_core::ResourceType;
use thiserror::Error;

use crate::error::{MrcpError, MrcpResult};
use crate::registry;

pub const CHANNEL_IDENTIFIER: &str = "Channel-Identifier";
pub const COMPLETION_CAUSE: &str = "Completion-Cause";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const ACTIVE_REQUEST_ID_LIST: &str = "Active-Request-Id-List";

/// Why a raw header string was rejected by its factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct IllegalValue {
    pub reason: String,
}

impl IllegalValue {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A typed header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Integer(u64),
    Boolean(bool),
    /// Always within `[0.0, 1.0]`.
    Float(f64),
    ChannelIdentifier(ChannelIdentifier),
    CompletionCause(CompletionCause),
}

impl HeaderValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            HeaderValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_channel_identifier(&self) -> Option<&ChannelIdentifier> {
        match self {
            HeaderValue::ChannelIdentifier(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_completion_cause(&self) -> Option<&CompletionCause> {
        match self {
            HeaderValue::CompletionCause(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Canonical wire text. Floats keep a fractional digit (`1.0`, `0.5`).
impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Text(text) => f.write_str(text),
            HeaderValue::Integer(value) => write!(f, "{value}"),
            HeaderValue::Boolean(value) => write!(f, "{value}"),
            HeaderValue::Float(value) => write!(f, "{value:?}"),
            HeaderValue::ChannelIdentifier(id) => write!(f, "{id}"),
            HeaderValue::CompletionCause(cause) => write!(f, "{cause}"),
        }
    }
}

/// One `Name:value` line.
///
/// The typed value is resolved on first access and cached. A value that
/// fails to resolve does not affect the rest of the message.
#[derive(Debug, Clone)]
pub struct Header {
    name: String,
    raw: String,
    value: OnceLock<Result<HeaderValue, IllegalValue>>,
}

impl Header {
    /// A header from its wire text. Resolution is deferred.
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: raw.into(),
            value: OnceLock::new(),
        }
    }

    /// A header from a typed value; the raw text is its canonical form.
    pub fn typed(name: impl Into<String>, value: HeaderValue) -> Self {
        let name = name.into();
        let raw = registry::format_value(&name, &value);
        let cell = OnceLock::new();
        let _ = cell.set(Ok(value));
        Self {
            name,
            raw,
            value: cell,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    fn resolve(&self) -> &Result<HeaderValue, IllegalValue> {
        self.value
            .get_or_init(|| registry::parse_value(&self.name, &self.raw))
    }

    /// The typed value, or a header-value error carrying the raw text.
    pub fn value(&self) -> MrcpResult<&HeaderValue> {
        self.resolve()
            .as_ref()
            .map_err(|illegal| MrcpError::header_value(&self.name, &self.raw, illegal))
    }

    pub fn is_valid(&self) -> bool {
        self.resolve().is_ok()
    }

    /// True when no factory is registered for this name.
    pub fn is_vendor_specific(&self) -> bool {
        registry::lookup(&self.name).is_none()
    }

    /// Same value under another spelling of the name.
    pub(crate) fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.has_name(&other.name) && self.raw == other.raw
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.raw)
    }
}

/// `<channel-id>@<resource-type>`.
///
/// The channel-id is kept as given; the wire form, equality and hashing
/// use it trimmed.
#[derive(Debug, Clone)]
pub struct ChannelIdentifier {
    channel_id: String,
    resource_type: ResourceType,
}

impl ChannelIdentifier {
    /// Rejects empty or whitespace-only channel-ids.
    pub fn new(
        channel_id: impl Into<String>,
        resource_type: ResourceType,
    ) -> Result<Self, IllegalValue> {
        let channel_id = channel_id.into();
        if channel_id.trim().is_empty() {
            return Err(IllegalValue::new("channel-id must not be empty"));
        }
        Ok(Self {
            channel_id,
            resource_type,
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// The trimmed channel-id used for routing.
    pub fn key(&self) -> &str {
        self.channel_id.trim()
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Parses the header value form. Whitespace around either token is
    /// ignored; exactly one `@` is required.
    pub fn parse(value: &str) -> Result<Self, IllegalValue> {
        let mut tokens = value.split('@');
        let (Some(channel_id), Some(resource), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(IllegalValue::new(format!(
                "expected <channel-id>@<resource-type>, got {value:?}"
            )));
        };
        let resource_type = resource
            .trim()
            .parse::<ResourceType>()
            .map_err(|err| IllegalValue::new(err.to_string()))?;
        Self::new(channel_id.trim(), resource_type)
    }
}

impl PartialEq for ChannelIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key() && self.resource_type == other.resource_type
    }
}

impl Eq for ChannelIdentifier {}

impl std::hash::Hash for ChannelIdentifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
        self.resource_type.hash(state);
    }
}

impl fmt::Display for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.channel_id.trim(), self.resource_type)
    }
}

/// `<code> <name>`, code zero-padded to three digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompletionCause {
    code: u16,
    name: String,
}

impl CompletionCause {
    /// Code must be at most 999; the name, once trimmed, must be a single
    /// non-empty token.
    pub fn new(code: u16, name: impl Into<String>) -> Result<Self, IllegalValue> {
        let name = name.into();
        if code > 999 {
            return Err(IllegalValue::new(format!(
                "cause code {code} is outside 0..=999"
            )));
        }
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(IllegalValue::new("cause name must not be empty"));
        }
        if trimmed.contains(char::is_whitespace) {
            return Err(IllegalValue::new(format!(
                "cause name {trimmed:?} contains whitespace"
            )));
        }
        Ok(Self { code, name })
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Splits on single spaces; anything other than exactly two tokens fails.
    pub fn parse(value: &str) -> Result<Self, IllegalValue> {
        let tokens: Vec<&str> = value.split(' ').collect();
        let [code, name] = tokens.as_slice() else {
            return Err(IllegalValue::new(format!(
                "expected <code> <name>, got {value:?}"
            )));
        };
        let code: u16 = code
            .parse()
            .map_err(|_| IllegalValue::new(format!("invalid cause code {code:?}")))?;
        Self::new(code, *name)
    }
}

impl fmt::Display for CompletionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03} {}", self.code, self.name.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn channel_identifier_formats_trimmed() {
        let id = ChannelIdentifier::new("  test  ", ResourceType::SpeechRecog).unwrap();
        assert_eq!(id.channel_id(), "  test  ");
        assert_eq!(id.key(), "test");
        assert_eq!(id.to_string(), "test@speechrecog");
    }

    #[test]
    fn channel_identifier_rejects_blank_id() {
        assert!(ChannelIdentifier::new("", ResourceType::SpeechRecog).is_err());
        assert!(ChannelIdentifier::new("   ", ResourceType::SpeechRecog).is_err());
    }

    #[test]
    fn channel_identifier_equality() {
        let a = ChannelIdentifier::new("test", ResourceType::SpeechRecog).unwrap();
        let b = ChannelIdentifier::new("test", ResourceType::SpeechRecog).unwrap();
        let c = ChannelIdentifier::new("different", ResourceType::SpeechRecog).unwrap();
        let d = ChannelIdentifier::new("test", ResourceType::SpeechSynth).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);

        // same wire form, same identity
        let padded = ChannelIdentifier::new("  test", ResourceType::SpeechRecog).unwrap();
        assert_eq!(padded, a);
        let set: std::collections::HashSet<_> = [a, padded].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn channel_identifier_parse() {
        let id = ChannelIdentifier::parse("  test  @  SpeechRecog  ").unwrap();
        assert_eq!(id.channel_id(), "test");
        assert_eq!(id.resource_type(), ResourceType::SpeechRecog);

        for bad in [
            "invalid-format",
            "test@invalid@speechrecog",
            "test@invalidresource",
            "test@",
            "@speechrecog",
        ] {
            assert!(ChannelIdentifier::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn completion_cause_formatting() {
        assert_eq!(CompletionCause::new(200, "success").unwrap().to_string(), "200 success");
        assert_eq!(CompletionCause::new(5, "test").unwrap().to_string(), "005 test");
        assert_eq!(CompletionCause::new(0, "a").unwrap().to_string(), "000 a");

        let padded = CompletionCause::new(200, "  success  ").unwrap();
        assert_eq!(padded.name(), "  success  ");
        assert_eq!(padded.to_string(), "200 success");
    }

    #[test]
    fn completion_cause_constructor_rejects() {
        assert!(CompletionCause::new(1000, "invalid").is_err());
        assert!(CompletionCause::new(200, "").is_err());
        assert!(CompletionCause::new(200, "   ").is_err());
        assert!(CompletionCause::new(200, "invalid name").is_err());
    }

    #[test]
    fn completion_cause_parse() {
        let cause = CompletionCause::parse("005 test").unwrap();
        assert_eq!(cause.code(), 5);
        assert_eq!(cause.name(), "test");

        for bad in [
            "invalid-format",
            "200 too many tokens",
            "abc success",
            "-1 invalid",
            "1000 invalid",
            "",
            "   ",
            "200   success  ",
        ] {
            assert!(CompletionCause::parse(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn header_value_failure_is_isolated() {
        let header = Header::new(COMPLETION_CAUSE, "abc success");
        assert!(!header.is_valid());
        let err = header.value().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HeaderValue);
        assert_eq!(err.raw_value(), Some("abc success"));
        assert_eq!(header.raw_value(), "abc success");
    }

    #[test]
    fn typed_header_uses_canonical_text() {
        let cause = CompletionCause::new(1, "no-match").unwrap();
        let header = Header::typed(COMPLETION_CAUSE, HeaderValue::CompletionCause(cause.clone()));
        assert_eq!(header.raw_value(), "001 no-match");
        assert_eq!(
            header.value().unwrap().as_completion_cause(),
            Some(&cause)
        );
        assert_eq!(header.to_string(), "Completion-Cause:001 no-match");
    }

    #[test]
    fn vendor_header_passes_through() {
        let header = Header::new("com.example.foo", "  anything goes ");
        assert!(header.is_vendor_specific());
        assert_eq!(
            header.value().unwrap(),
            &HeaderValue::Text("  anything goes ".to_string())
        );
        assert_eq!(header.name(), "com.example.foo");
    }

    #[test]
    fn header_names_compare_case_insensitively() {
        assert_eq!(
            Header::new("channel-identifier", "a@recorder"),
            Header::new(CHANNEL_IDENTIFIER, "a@recorder")
        );
        assert_ne!(
            Header::new(CHANNEL_IDENTIFIER, "a@recorder"),
            Header::new(CHANNEL_IDENTIFIER, "b@recorder")
        );
    }

    #[test]
    fn float_display_keeps_fraction() {
        assert_eq!(HeaderValue::Float(1.0).to_string(), "1.0");
        assert_eq!(HeaderValue::Float(0.25).to_string(), "0.25");
    }
}
