//! MRCPv2 event names.

use std::fmt;
use std::str::FromStr;

use crate::vocabulary::{UnknownToken, lookup_symbol, lookup_wire};

/// An asynchronous event emitted by a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum EventName {
    SpeechMarker,
    SpeakComplete,
    StartOfInput,
    RecognitionComplete,
    InterpretationComplete,
    RecordComplete,
    VerificationComplete,
}

const EVENTS: [(EventName, &str, &str); 7] = [
    (EventName::SpeechMarker, "SPEECH-MARKER", "SPEECH_MARKER"),
    (EventName::SpeakComplete, "SPEAK-COMPLETE", "SPEAK_COMPLETE"),
    (EventName::StartOfInput, "START-OF-INPUT", "START_OF_INPUT"),
    (
        EventName::RecognitionComplete,
        "RECOGNITION-COMPLETE",
        "RECOGNITION_COMPLETE",
    ),
    (
        EventName::InterpretationComplete,
        "INTERPRETATION-COMPLETE",
        "INTERPRETATION_COMPLETE",
    ),
    (EventName::RecordComplete, "RECORD-COMPLETE", "RECORD_COMPLETE"),
    (
        EventName::VerificationComplete,
        "VERIFICATION-COMPLETE",
        "VERIFICATION_COMPLETE",
    ),
];

impl EventName {
    /// Every event, in table order.
    pub fn all() -> impl Iterator<Item = EventName> {
        EVENTS.iter().map(|(e, _, _)| *e)
    }

    pub fn as_str(self) -> &'static str {
        EVENTS[self as usize].1
    }

    pub fn symbol(self) -> &'static str {
        EVENTS[self as usize].2
    }

    pub fn from_symbol(symbol: &str) -> Result<Self, UnknownToken> {
        lookup_symbol(&EVENTS, "event symbol", symbol)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup_wire(&EVENTS, "event name", s)
    }
}
