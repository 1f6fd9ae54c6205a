//! MRCPv2 resource types.

use std::fmt;
use std::str::FromStr;

use crate::vocabulary::{UnknownToken, lookup_symbol, lookup_wire};

/// The kind of media resource a channel controls.
///
/// Canonical form is lower-case; parsing ignores case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ResourceType {
    SpeechRecog,
    DtmfRecog,
    SpeechSynth,
    BasicSynth,
    SpeakVerify,
    Recorder,
}

const RESOURCES: [(ResourceType, &str, &str); 6] = [
    (ResourceType::SpeechRecog, "speechrecog", "SPEECHRECOG"),
    (ResourceType::DtmfRecog, "dtmfrecog", "DTMFRECOG"),
    (ResourceType::SpeechSynth, "speechsynth", "SPEECHSYNTH"),
    (ResourceType::BasicSynth, "basicsynth", "BASICSYNTH"),
    (ResourceType::SpeakVerify, "speakverify", "SPEAKVERIFY"),
    (ResourceType::Recorder, "recorder", "RECORDER"),
];

impl ResourceType {
    pub fn all() -> impl Iterator<Item = ResourceType> {
        RESOURCES.iter().map(|(r, _, _)| *r)
    }

    /// Lower-case wire token.
    pub fn as_str(self) -> &'static str {
        RESOURCES[self as usize].1
    }

    pub fn symbol(self) -> &'static str {
        RESOURCES[self as usize].2
    }

    pub fn from_symbol(symbol: &str) -> Result<Self, UnknownToken> {
        lookup_symbol(&RESOURCES, "resource symbol", symbol)
    }

    pub fn is_recognizer(self) -> bool {
        matches!(self, Self::SpeechRecog | Self::DtmfRecog)
    }

    pub fn is_synthesizer(self) -> bool {
        matches!(self, Self::SpeechSynth | Self::BasicSynth)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup_wire(&RESOURCES, "resource type", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_lower_case() {
        assert_eq!(ResourceType::SpeechRecog.to_string(), "speechrecog");
        assert_eq!(ResourceType::SpeakVerify.to_string(), "speakverify");
        assert_eq!(ResourceType::all().count(), 6);
    }

    #[test]
    fn parse_ignores_case() {
        assert_eq!(
            "SPEECHRECOG".parse::<ResourceType>().unwrap(),
            ResourceType::SpeechRecog
        );
        assert_eq!(
            "DtmfRecog".parse::<ResourceType>().unwrap(),
            ResourceType::DtmfRecog
        );
        assert_eq!(
            "Recorder".parse::<ResourceType>().unwrap(),
            ResourceType::Recorder
        );
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "invalid-resource".parse::<ResourceType>().unwrap_err();
        assert_eq!(err.vocabulary, "resource type");
        assert!("".parse::<ResourceType>().is_err());
        assert!("   ".parse::<ResourceType>().is_err());
    }

    #[test]
    fn families() {
        assert!(ResourceType::DtmfRecog.is_recognizer());
        assert!(!ResourceType::Recorder.is_recognizer());
        assert!(ResourceType::BasicSynth.is_synthesizer());
        assert_eq!(
            ResourceType::from_symbol("SPEAKVERIFY").unwrap(),
            ResourceType::SpeakVerify
        );
    }
}
