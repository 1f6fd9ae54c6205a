//! MRCPv2 response status codes.

use std::fmt;

/// A three-digit response status.
///
/// Unknown codes are representable; only the registered ones carry a
/// [`description`](StatusCode::description).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const SUCCESS: StatusCode = StatusCode(200);
    pub const SUCCESS_SOME_OPTIONAL_HEADERS_IGNORED: StatusCode = StatusCode(201);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(401);
    pub const METHOD_NOT_VALID_IN_STATE: StatusCode = StatusCode(402);
    pub const UNSUPPORTED_HEADER: StatusCode = StatusCode(403);
    pub const ILLEGAL_VALUE_FOR_HEADER: StatusCode = StatusCode(404);
    pub const RESOURCE_NOT_ALLOCATED: StatusCode = StatusCode(405);
    pub const MANDATORY_HEADER_MISSING: StatusCode = StatusCode(406);
    pub const OPERATION_FAILED: StatusCode = StatusCode(407);
    pub const UNRECOGNIZED_MESSAGE_ENTITY: StatusCode = StatusCode(408);
    pub const UNSUPPORTED_HEADER_VALUE: StatusCode = StatusCode(409);
    pub const NON_MONOTONIC_SEQUENCE_NUMBER: StatusCode = StatusCode(410);
    pub const SERVER_INTERNAL_ERROR: StatusCode = StatusCode(501);
    pub const PROTOCOL_VERSION_NOT_SUPPORTED: StatusCode = StatusCode(502);
    pub const PROXY_TIMEOUT: StatusCode = StatusCode(503);
    pub const MESSAGE_TOO_LARGE: StatusCode = StatusCode(504);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// 2xx.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    /// 4xx: the request was rejected by the client-facing checks.
    pub fn is_client_failure(self) -> bool {
        (400..500).contains(&self.0)
    }

    /// 5xx.
    pub fn is_server_failure(self) -> bool {
        (500..600).contains(&self.0)
    }

    pub fn description(self) -> Option<&'static str> {
        let text = match self.0 {
            200 => "STATUS_SUCCESS",
            201 => "STATUS_SUCCESS_SOME_OPTIONAL_HEADERS_IGNORED",
            401 => "STATUS_METHOD_NOT_ALLOWED",
            402 => "STATUS_METHOD_NOT_VALID_IN_STATE",
            403 => "STATUS_UNSUPPORTED_HEADER",
            404 => "STATUS_ILLEGAL_VALUE_FOR_HEADER",
            405 => "STATUS_RESOURCE_NOT_ALLOCATED",
            406 => "STATUS_MANDATORY_HEADER_MISSING",
            407 => "STATUS_OPERATION_FAILED",
            408 => "STATUS_UNRECOGNIZED_MESSAGE_ENTITY",
            409 => "STATUS_UNSUPPORTED_HEADER_VALUE",
            410 => "STATUS_NON_MONOTONIC_SEQUENCE_NUMBER",
            501 => "STATUS_SERVER_INTERNAL_ERROR",
            502 => "STATUS_PROTOCOL_VERSION_NOT_SUPPORTED",
            503 => "STATUS_PROXY_TIMEOUT",
            504 => "STATUS_MESSAGE_TOO_LARGE",
            _ => return None,
        };
        Some(text)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

/// Always three digits, zero-padded.
impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert!(StatusCode::SUCCESS.is_success());
        assert!(StatusCode::SUCCESS_SOME_OPTIONAL_HEADERS_IGNORED.is_success());
        assert!(!StatusCode::OPERATION_FAILED.is_success());
        assert!(StatusCode::NON_MONOTONIC_SEQUENCE_NUMBER.is_client_failure());
        assert!(StatusCode::SERVER_INTERNAL_ERROR.is_server_failure());
    }

    #[test]
    fn every_registered_code_has_its_description() {
        let table = [
            (StatusCode::SUCCESS, "STATUS_SUCCESS"),
            (
                StatusCode::SUCCESS_SOME_OPTIONAL_HEADERS_IGNORED,
                "STATUS_SUCCESS_SOME_OPTIONAL_HEADERS_IGNORED",
            ),
            (StatusCode::METHOD_NOT_ALLOWED, "STATUS_METHOD_NOT_ALLOWED"),
            (StatusCode::METHOD_NOT_VALID_IN_STATE, "STATUS_METHOD_NOT_VALID_IN_STATE"),
            (StatusCode::UNSUPPORTED_HEADER, "STATUS_UNSUPPORTED_HEADER"),
            (StatusCode::ILLEGAL_VALUE_FOR_HEADER, "STATUS_ILLEGAL_VALUE_FOR_HEADER"),
            (StatusCode::RESOURCE_NOT_ALLOCATED, "STATUS_RESOURCE_NOT_ALLOCATED"),
            (StatusCode::MANDATORY_HEADER_MISSING, "STATUS_MANDATORY_HEADER_MISSING"),
            (StatusCode::OPERATION_FAILED, "STATUS_OPERATION_FAILED"),
            (StatusCode::UNRECOGNIZED_MESSAGE_ENTITY, "STATUS_UNRECOGNIZED_MESSAGE_ENTITY"),
            (StatusCode::UNSUPPORTED_HEADER_VALUE, "STATUS_UNSUPPORTED_HEADER_VALUE"),
            (
                StatusCode::NON_MONOTONIC_SEQUENCE_NUMBER,
                "STATUS_NON_MONOTONIC_SEQUENCE_NUMBER",
            ),
            (StatusCode::SERVER_INTERNAL_ERROR, "STATUS_SERVER_INTERNAL_ERROR"),
            (
                StatusCode::PROTOCOL_VERSION_NOT_SUPPORTED,
                "STATUS_PROTOCOL_VERSION_NOT_SUPPORTED",
            ),
            (StatusCode::PROXY_TIMEOUT, "STATUS_PROXY_TIMEOUT"),
            (StatusCode::MESSAGE_TOO_LARGE, "STATUS_MESSAGE_TOO_LARGE"),
        ];
        let codes: Vec<u16> = table.iter().map(|(code, _)| code.as_u16()).collect();
        assert_eq!(
            codes,
            [200, 201, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 501, 502, 503, 504]
        );
        for (code, text) in table {
            assert_eq!(code.description(), Some(text), "{code}");
        }
    }

    #[test]
    fn unregistered_codes_have_no_description() {
        assert_eq!(StatusCode::new(999).description(), None);
        assert_eq!(StatusCode::new(300).description(), None);
        assert_eq!(StatusCode::new(411).description(), None);
        assert_eq!(StatusCode::new(500).description(), None);
    }

    #[test]
    fn display_is_three_digits() {
        assert_eq!(StatusCode::SUCCESS.to_string(), "200");
        assert_eq!(StatusCode::new(7).to_string(), "007");
    }
}
