//! Shared lookup helpers for the closed MRCPv2 vocabularies.
//!
//! Every vocabulary (methods, events, resource types, request states) is a
//! fixed table of `(variant, wire token, internal symbol)` rows. Parsing
//! walks the table with a case-insensitive comparison and fails explicitly
//! when nothing matches.

use thiserror::Error;

/// A token that does not belong to a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {vocabulary}: {token:?}")]
pub struct UnknownToken {
    /// Which vocabulary was consulted (e.g. "method name").
    pub vocabulary: &'static str,
    /// The rejected input, untrimmed.
    pub token: String,
}

impl UnknownToken {
    pub(crate) fn new(vocabulary: &'static str, token: &str) -> Self {
        Self {
            vocabulary,
            token: token.to_string(),
        }
    }
}

/// Looks up `token` by wire form, ignoring ASCII case.
pub(crate) fn lookup_wire<T: Copy>(
    table: &[(T, &'static str, &'static str)],
    vocabulary: &'static str,
    token: &str,
) -> Result<T, UnknownToken> {
    table
        .iter()
        .find(|(_, wire, _)| !token.is_empty() && wire.eq_ignore_ascii_case(token))
        .map(|(value, _, _)| *value)
        .ok_or_else(|| UnknownToken::new(vocabulary, token))
}

/// Looks up `symbol` by internal symbol form (`SET_PARAMS`), exact match.
pub(crate) fn lookup_symbol<T: Copy>(
    table: &[(T, &'static str, &'static str)],
    vocabulary: &'static str,
    symbol: &str,
) -> Result<T, UnknownToken> {
    table
        .iter()
        .find(|(_, _, sym)| *sym == symbol)
        .map(|(value, _, _)| *value)
        .ok_or_else(|| UnknownToken::new(vocabulary, symbol))
}
