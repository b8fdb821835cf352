//! HTTP 状态码分类：将数值状态码映射到封闭的分类体系。
//!
//! HTTP status taxonomy.
//!
//! Every response that reaches the interception pipeline is classified into one
//! of the variants below before any branching happens. The taxonomy is closed:
//! codes outside the known ranges land in [`StatusCode::Unknown`].
//!
//! | Range / code | Variant |
//! |--------------|---------|
//! | 200–299 | `Success(code)` |
//! | 400 | `BadRequest` |
//! | 401 | `Unauthorised` |
//! | 403 | `Forbidden` |
//! | 405 | `MethodNotAllowed` |
//! | 408 | `Timeout` |
//! | 409 | `Conflict` |
//! | 429 | `TooManyRequests` |
//! | other 4xx | `OtherClientError(code)` |
//! | 500–599 | `ServerError(code)` |
//! | anything else | `Unknown(code)` |
//!
//! ## Example
//!
//! ```rust
//! use resilient_netkit::status_code::StatusCode;
//!
//! let status = StatusCode::from_code(503);
//! assert!(status.is_server_error());
//! assert_eq!(status.code(), 503);
//! assert_eq!(status.name(), "server_error");
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success(u16),
    BadRequest,
    Unauthorised,
    Forbidden,
    MethodNotAllowed,
    Timeout,
    Conflict,
    TooManyRequests,
    OtherClientError(u16),
    ServerError(u16),
    Unknown(u16),
}

impl StatusCode {
    /// Classifies a numeric HTTP status.
    pub fn from_code(code: u16) -> Self {
        match code {
            200..=299 => Self::Success(code),
            400 => Self::BadRequest,
            401 => Self::Unauthorised,
            403 => Self::Forbidden,
            405 => Self::MethodNotAllowed,
            408 => Self::Timeout,
            409 => Self::Conflict,
            429 => Self::TooManyRequests,
            400..=499 => Self::OtherClientError(code),
            500..=599 => Self::ServerError(code),
            _ => Self::Unknown(code),
        }
    }

    /// Returns the numeric status this classification was built from.
    #[inline]
    pub fn code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorised => 401,
            Self::Forbidden => 403,
            Self::MethodNotAllowed => 405,
            Self::Timeout => 408,
            Self::Conflict => 409,
            Self::TooManyRequests => 429,
            Self::Success(code)
            | Self::OtherClientError(code)
            | Self::ServerError(code)
            | Self::Unknown(code) => *code,
        }
    }

    /// Returns the snake_case name used in logs and trace records.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::BadRequest => "bad_request",
            Self::Unauthorised => "unauthorised",
            Self::Forbidden => "forbidden",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
            Self::TooManyRequests => "too_many_requests",
            Self::OtherClientError(_) => "other_client_error",
            Self::ServerError(_) => "server_error",
            Self::Unknown(_) => "unknown",
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// True for every 4xx classification, including 401 and 409.
    #[inline]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest
                | Self::Unauthorised
                | Self::Forbidden
                | Self::MethodNotAllowed
                | Self::Timeout
                | Self::Conflict
                | Self::TooManyRequests
                | Self::OtherClientError(_)
        )
    }

    #[inline]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ServerError(_))
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_codes() {
        assert_eq!(StatusCode::from_code(400), StatusCode::BadRequest);
        assert_eq!(StatusCode::from_code(401), StatusCode::Unauthorised);
        assert_eq!(StatusCode::from_code(403), StatusCode::Forbidden);
        assert_eq!(StatusCode::from_code(405), StatusCode::MethodNotAllowed);
        assert_eq!(StatusCode::from_code(408), StatusCode::Timeout);
        assert_eq!(StatusCode::from_code(409), StatusCode::Conflict);
        assert_eq!(StatusCode::from_code(429), StatusCode::TooManyRequests);
    }

    #[test]
    fn test_ranges() {
        assert_eq!(StatusCode::from_code(200), StatusCode::Success(200));
        assert_eq!(StatusCode::from_code(204), StatusCode::Success(204));
        assert_eq!(StatusCode::from_code(404), StatusCode::OtherClientError(404));
        assert_eq!(StatusCode::from_code(500), StatusCode::ServerError(500));
        assert_eq!(StatusCode::from_code(599), StatusCode::ServerError(599));
        assert_eq!(StatusCode::from_code(302), StatusCode::Unknown(302));
        assert_eq!(StatusCode::from_code(600), StatusCode::Unknown(600));
        assert_eq!(StatusCode::from_code(100), StatusCode::Unknown(100));
    }

    #[test]
    fn test_code_is_preserved() {
        for code in [200, 201, 400, 401, 403, 404, 405, 408, 409, 429, 451, 500, 503, 302] {
            assert_eq!(StatusCode::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_classification_helpers() {
        assert!(StatusCode::from_code(401).is_client_error());
        assert!(StatusCode::from_code(409).is_client_error());
        assert!(!StatusCode::from_code(502).is_client_error());
        assert!(StatusCode::from_code(502).is_server_error());
        assert!(!StatusCode::from_code(302).is_server_error());
        assert!(StatusCode::from_code(299).is_success());
    }
}
