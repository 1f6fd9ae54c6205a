//! Process-wide table of header value factories.
//!
//! Built once on first use and never mutated. Names are matched without
//! regard to case; anything not listed here is a vendor-specific header
//! whose value is its raw text.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::header::{ChannelIdentifier, CompletionCause, HeaderValue, IllegalValue};

pub type ParseFn = fn(&str) -> Result<HeaderValue, IllegalValue>;
pub type FormatFn = fn(&HeaderValue) -> String;

/// Parse and format functions for one header.
#[derive(Debug, Clone, Copy)]
pub struct HeaderFactory {
    /// Canonical spelling of the header name.
    pub name: &'static str,
    pub parse: ParseFn,
    pub format: FormatFn,
}

const INTEGER_HEADERS: &[&str] = &[
    "Content-Length",
    "Fetch-Timeout",
    "No-Input-Timeout",
    "Recognition-Timeout",
    "Speech-Complete-Timeout",
    "Speech-Incomplete-Timeout",
    "Hotword-Max-Duration",
    "Hotword-Min-Duration",
    "N-Best-List-Length",
];

const BOOLEAN_HEADERS: &[&str] = &[
    "Start-Input-Timers",
    "Save-Waveform",
    "Kill-On-Barge-In",
    "Early-No-Match",
];

const UNIT_FLOAT_HEADERS: &[&str] = &[
    "Confidence-Threshold",
    "Sensitivity-Level",
    "Speed-Vs-Accuracy",
];

const TEXT_HEADERS: &[&str] = &[
    "Content-Type",
    "Content-Id",
    "Content-Base",
    "Content-Encoding",
    "Content-Location",
    "Cache-Control",
    "Logging-Tag",
    "Proxy-Sync-Id",
    "Accept",
    "Accept-Charset",
    "Active-Request-Id-List",
    "Completion-Reason",
    "Waveform-Uri",
    "Speech-Language",
    "Voice-Name",
    "Recognizer-Context-Block",
];

static REGISTRY: LazyLock<HashMap<String, HeaderFactory>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    let mut register = |name: &'static str, parse: ParseFn| {
        map.insert(
            name.to_ascii_lowercase(),
            HeaderFactory {
                name,
                parse,
                format: format_canonical,
            },
        );
    };

    register("Channel-Identifier", parse_channel_identifier);
    register("Completion-Cause", parse_completion_cause);
    for &name in INTEGER_HEADERS {
        register(name, parse_integer);
    }
    for &name in BOOLEAN_HEADERS {
        register(name, parse_boolean);
    }
    for &name in UNIT_FLOAT_HEADERS {
        register(name, parse_unit_float);
    }
    for &name in TEXT_HEADERS {
        register(name, parse_text);
    }
    map
});

/// The factory registered for `name`, if any.
pub fn lookup(name: &str) -> Option<&'static HeaderFactory> {
    REGISTRY.get(&name.to_ascii_lowercase())
}

pub fn is_registered(name: &str) -> bool {
    lookup(name).is_some()
}

/// Resolves a raw value. Vendor-specific headers always succeed.
pub fn parse_value(name: &str, raw: &str) -> Result<HeaderValue, IllegalValue> {
    match lookup(name) {
        Some(factory) => (factory.parse)(raw),
        None => Ok(HeaderValue::Text(raw.to_string())),
    }
}

pub fn format_value(name: &str, value: &HeaderValue) -> String {
    match lookup(name) {
        Some(factory) => (factory.format)(value),
        None => value.to_string(),
    }
}

fn format_canonical(value: &HeaderValue) -> String {
    value.to_string()
}

fn parse_channel_identifier(raw: &str) -> Result<HeaderValue, IllegalValue> {
    ChannelIdentifier::parse(raw).map(HeaderValue::ChannelIdentifier)
}

fn parse_completion_cause(raw: &str) -> Result<HeaderValue, IllegalValue> {
    CompletionCause::parse(raw).map(HeaderValue::CompletionCause)
}

fn parse_integer(raw: &str) -> Result<HeaderValue, IllegalValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IllegalValue::new(format!(
            "expected a non-negative integer, got {raw:?}"
        )));
    }
    trimmed
        .parse()
        .map(HeaderValue::Integer)
        .map_err(|err| IllegalValue::new(format!("{raw:?}: {err}")))
}

fn parse_boolean(raw: &str) -> Result<HeaderValue, IllegalValue> {
    match raw.trim() {
        value if value.eq_ignore_ascii_case("true") => Ok(HeaderValue::Boolean(true)),
        value if value.eq_ignore_ascii_case("false") => Ok(HeaderValue::Boolean(false)),
        _ => Err(IllegalValue::new(format!(
            "expected true or false, got {raw:?}"
        ))),
    }
}

fn parse_unit_float(raw: &str) -> Result<HeaderValue, IllegalValue> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| IllegalValue::new(format!("expected a decimal, got {raw:?}")))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(IllegalValue::new(format!(
            "{value} is outside 0.0..=1.0"
        )));
    }
    Ok(HeaderValue::Float(value))
}

fn parse_text(raw: &str) -> Result<HeaderValue, IllegalValue> {
    Ok(HeaderValue::Text(raw.to_string()))
}
