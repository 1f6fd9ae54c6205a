//! Request completion state carried by responses and events.

use std::fmt;
use std::str::FromStr;

use crate::vocabulary::{UnknownToken, lookup_symbol, lookup_wire};

/// Completion marker attached to responses and events.
///
/// ```text
///  PENDING ──► IN-PROGRESS ──► COMPLETE
///     │                           ▲
///     └───────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum RequestState {
    /// Queued but not yet started.
    Pending,
    /// Acknowledged; a terminal event will follow.
    InProgress,
    /// Terminal.
    Complete,
}

const STATES: [(RequestState, &str, &str); 3] = [
    (RequestState::Pending, "PENDING", "PENDING"),
    (RequestState::InProgress, "IN-PROGRESS", "IN_PROGRESS"),
    (RequestState::Complete, "COMPLETE", "COMPLETE"),
];

impl RequestState {
    pub fn as_str(self) -> &'static str {
        STATES[self as usize].1
    }

    pub fn from_symbol(symbol: &str) -> Result<Self, UnknownToken> {
        lookup_symbol(&STATES, "request state symbol", symbol)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Complete
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup_wire(&STATES, "request state", s)
    }
}
