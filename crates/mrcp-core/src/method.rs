//! MRCPv2 method names.

use std::fmt;
use std::str::FromStr;

use crate::resource::ResourceType;
use crate::vocabulary::{UnknownToken, lookup_symbol, lookup_wire};

/// A request method. The wire form is hyphenated (`SET-PARAMS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum MethodName {
    SetParams,
    GetParams,
    Speak,
    Stop,
    Pause,
    Resume,
    BargeInOccurred,
    Control,
    DefineLexicon,
    DefineGrammar,
    Recognize,
    Interpret,
    GetResult,
    StartInputTimers,
    StartPhraseEnrollment,
    EnrollmentRollback,
    EndPhraseEnrollment,
    ModifyPhrase,
    DeletePhrase,
    Record,
    StartSession,
    EndSession,
    QueryVoiceprint,
    DeleteVoiceprint,
    Verify,
    VerifyFromBuffer,
    VerifyRollback,
    ClearBuffer,
    GetIntermediateResult,
}

/// Rows are in discriminant order.
const METHODS: [(MethodName, &str, &str); 29] = [
    (MethodName::SetParams, "SET-PARAMS", "SET_PARAMS"),
    (MethodName::GetParams, "GET-PARAMS", "GET_PARAMS"),
    (MethodName::Speak, "SPEAK", "SPEAK"),
    (MethodName::Stop, "STOP", "STOP"),
    (MethodName::Pause, "PAUSE", "PAUSE"),
    (MethodName::Resume, "RESUME", "RESUME"),
    (MethodName::BargeInOccurred, "BARGE-IN-OCCURRED", "BARGE_IN_OCCURRED"),
    (MethodName::Control, "CONTROL", "CONTROL"),
    (MethodName::DefineLexicon, "DEFINE-LEXICON", "DEFINE_LEXICON"),
    (MethodName::DefineGrammar, "DEFINE-GRAMMAR", "DEFINE_GRAMMAR"),
    (MethodName::Recognize, "RECOGNIZE", "RECOGNIZE"),
    (MethodName::Interpret, "INTERPRET", "INTERPRET"),
    (MethodName::GetResult, "GET-RESULT", "GET_RESULT"),
    (MethodName::StartInputTimers, "START-INPUT-TIMERS", "START_INPUT_TIMERS"),
    (
        MethodName::StartPhraseEnrollment,
        "START-PHRASE-ENROLLMENT",
        "START_PHRASE_ENROLLMENT",
    ),
    (MethodName::EnrollmentRollback, "ENROLLMENT-ROLLBACK", "ENROLLMENT_ROLLBACK"),
    (
        MethodName::EndPhraseEnrollment,
        "END-PHRASE-ENROLLMENT",
        "END_PHRASE_ENROLLMENT",
    ),
    (MethodName::ModifyPhrase, "MODIFY-PHRASE", "MODIFY_PHRASE"),
    (MethodName::DeletePhrase, "DELETE-PHRASE", "DELETE_PHRASE"),
    (MethodName::Record, "RECORD", "RECORD"),
    (MethodName::StartSession, "START-SESSION", "START_SESSION"),
    (MethodName::EndSession, "END-SESSION", "END_SESSION"),
    (MethodName::QueryVoiceprint, "QUERY-VOICEPRINT", "QUERY_VOICEPRINT"),
    (MethodName::DeleteVoiceprint, "DELETE-VOICEPRINT", "DELETE_VOICEPRINT"),
    (MethodName::Verify, "VERIFY", "VERIFY"),
    (MethodName::VerifyFromBuffer, "VERIFY-FROM-BUFFER", "VERIFY_FROM_BUFFER"),
    (MethodName::VerifyRollback, "VERIFY-ROLLBACK", "VERIFY_ROLLBACK"),
    (MethodName::ClearBuffer, "CLEAR-BUFFER", "CLEAR_BUFFER"),
    (
        MethodName::GetIntermediateResult,
        "GET-INTERMEDIATE-RESULT",
        "GET_INTERMEDIATE_RESULT",
    ),
];

impl MethodName {
    /// Every method, in table order.
    pub fn all() -> impl Iterator<Item = MethodName> {
        METHODS.iter().map(|(m, _, _)| *m)
    }

    /// The hyphenated wire token.
    pub fn as_str(self) -> &'static str {
        METHODS[self as usize].1
    }

    /// The internal symbol (`SET_PARAMS`).
    pub fn symbol(self) -> &'static str {
        METHODS[self as usize].2
    }

    /// Parses the internal symbol form. Exact match only.
    pub fn from_symbol(symbol: &str) -> Result<Self, UnknownToken> {
        lookup_symbol(&METHODS, "method symbol", symbol)
    }

    /// Whether a channel of `resource` accepts this method.
    ///
    /// `SET-PARAMS` and `GET-PARAMS` are valid everywhere; everything else
    /// belongs to the synthesizer, recognizer, recorder or verifier family.
    pub fn is_valid_for(self, resource: ResourceType) -> bool {
        use MethodName::*;

        match self {
            SetParams | GetParams => true,
            Stop => true,
            Speak | Pause | Resume | BargeInOccurred | Control | DefineLexicon => {
                resource.is_synthesizer()
            }
            DefineGrammar | Recognize | Interpret | GetResult | StartPhraseEnrollment
            | EnrollmentRollback | EndPhraseEnrollment | ModifyPhrase | DeletePhrase => {
                resource.is_recognizer()
            }
            StartInputTimers => {
                resource.is_recognizer()
                    || matches!(resource, ResourceType::Recorder | ResourceType::SpeakVerify)
            }
            Record => resource == ResourceType::Recorder,
            StartSession | EndSession | QueryVoiceprint | DeleteVoiceprint | Verify
            | VerifyFromBuffer | VerifyRollback | ClearBuffer | GetIntermediateResult => {
                resource == ResourceType::SpeakVerify
            }
        }
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodName {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup_wire(&METHODS, "method name", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_discriminants() {
        for (index, (method, _, _)) in METHODS.iter().enumerate() {
            assert_eq!(*method as usize, index);
        }
        assert_eq!(MethodName::all().count(), 29);
    }

    #[test]
    fn wire_form_is_hyphenated() {
        assert_eq!(MethodName::SetParams.to_string(), "SET-PARAMS");
        assert_eq!(MethodName::BargeInOccurred.to_string(), "BARGE-IN-OCCURRED");
        assert_eq!(
            MethodName::GetIntermediateResult.to_string(),
            "GET-INTERMEDIATE-RESULT"
        );
        assert_eq!(MethodName::Speak.to_string(), "SPEAK");
    }

    #[test]
    fn parse_every_wire_token() {
        for method in MethodName::all() {
            assert_eq!(method.as_str().parse::<MethodName>().unwrap(), method);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("set-params".parse::<MethodName>().unwrap(), MethodName::SetParams);
        assert_eq!("Set-Params".parse::<MethodName>().unwrap(), MethodName::SetParams);
        assert_eq!(
            "Barge-In-Occurred".parse::<MethodName>().unwrap(),
            MethodName::BargeInOccurred
        );
    }

    #[test]
    fn parse_rejects_unknown_and_blank() {
        assert!("INVALID-METHOD".parse::<MethodName>().is_err());
        assert!("".parse::<MethodName>().is_err());
        assert!("   ".parse::<MethodName>().is_err());
        // symbol form is not a wire token
        assert!("SET_PARAMS".parse::<MethodName>().is_err());
    }

    #[test]
    fn symbol_lookup() {
        assert_eq!(MethodName::from_symbol("SET_PARAMS").unwrap(), MethodName::SetParams);
        assert_eq!(MethodName::Stop.symbol(), "STOP");
        assert!(MethodName::from_symbol("INVALID_METHOD").is_err());
    }

    #[test]
    fn method_validity_per_resource() {
        assert!(MethodName::SetParams.is_valid_for(ResourceType::Recorder));
        assert!(MethodName::Recognize.is_valid_for(ResourceType::SpeechRecog));
        assert!(MethodName::Recognize.is_valid_for(ResourceType::DtmfRecog));
        assert!(!MethodName::Recognize.is_valid_for(ResourceType::SpeechSynth));
        assert!(MethodName::Speak.is_valid_for(ResourceType::BasicSynth));
        assert!(!MethodName::Speak.is_valid_for(ResourceType::SpeechRecog));
        assert!(MethodName::Record.is_valid_for(ResourceType::Recorder));
        assert!(MethodName::Verify.is_valid_for(ResourceType::SpeakVerify));
        assert!(MethodName::StartInputTimers.is_valid_for(ResourceType::Recorder));
    }
}
