//! Admission error taxonomy
//!
//! Every failure kind the pipeline can terminate with is a variant here,
//! carried as a value across stage boundaries rather than thrown.

use std::fmt;
use thiserror::Error;

/// Request surface where hostile content was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    Header(String),
    Path,
    Query,
    Body,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Header(name) => write!(f, "header:{}", name),
            Surface::Path => write!(f, "path"),
            Surface::Query => write!(f, "query"),
            Surface::Body => write!(f, "body"),
        }
    }
}

/// Terminal pipeline errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdmissionError {
    #[error("No bearer token provided")]
    MissingToken,

    #[error("Authorization header is not a well-formed bearer credential")]
    MalformedToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Token signature verification failed")]
    InvalidSignature,

    #[error("Token is missing required claims")]
    MissingClaims,

    #[error("Token validation failed")]
    TokenValidation,

    #[error("Token has been revoked")]
    BlacklistedToken,

    #[error("No active session for this token")]
    InvalidSession,

    #[error("Insufficient privileges for this route")]
    InsufficientPrivileges,

    #[error("Rate limit exceeded at {scope} scope")]
    RateLimited {
        scope: &'static str,
        retry_after_secs: u64,
    },

    #[error("Malicious content detected in {surface}")]
    MaliciousContent { surface: Surface },

    #[error("Request body exceeds the allowed size")]
    RequestTooLarge,

    #[error("Header value exceeds the allowed length")]
    HeaderTooLong,
}

impl AdmissionError {
    /// HTTP status the error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            AdmissionError::MaliciousContent { .. }
            | AdmissionError::RequestTooLarge
            | AdmissionError::HeaderTooLong => 400,
            AdmissionError::MissingToken
            | AdmissionError::MalformedToken
            | AdmissionError::ExpiredToken
            | AdmissionError::InvalidSignature
            | AdmissionError::MissingClaims
            | AdmissionError::TokenValidation
            | AdmissionError::BlacklistedToken
            | AdmissionError::InvalidSession => 401,
            AdmissionError::InsufficientPrivileges => 403,
            AdmissionError::RateLimited { .. } => 429,
        }
    }

    /// Machine-readable failure kind, also used as the anomaly key
    pub fn kind(&self) -> &'static str {
        match self {
            AdmissionError::MissingToken => "MISSING_TOKEN",
            AdmissionError::MalformedToken => "MALFORMED_TOKEN",
            AdmissionError::ExpiredToken => "EXPIRED_TOKEN",
            AdmissionError::InvalidSignature => "INVALID_SIGNATURE",
            AdmissionError::MissingClaims => "MISSING_CLAIMS",
            AdmissionError::TokenValidation => "TOKEN_VALIDATION_ERROR",
            AdmissionError::BlacklistedToken => "BLACKLISTED_TOKEN",
            AdmissionError::InvalidSession => "INVALID_SESSION",
            AdmissionError::InsufficientPrivileges => "INSUFFICIENT_PRIVILEGES",
            AdmissionError::RateLimited { .. } => "RATE_LIMITED",
            AdmissionError::MaliciousContent { .. } => "MALICIOUS_CONTENT",
            AdmissionError::RequestTooLarge => "REQUEST_TOO_LARGE",
            AdmissionError::HeaderTooLong => "HEADER_TOO_LONG",
        }
    }

    /// Name of the diagnostic header carrying the failure kind:
    /// `X-Validation-Error` for 400s, `X-Auth-Error` otherwise.
    pub fn diagnostic_header(&self) -> &'static str {
        match self.status_code() {
            400 => "x-validation-error",
            _ => "x-auth-error",
        }
    }

    /// Retry-After value for rate-limited responses
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AdmissionError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AdmissionError::RequestTooLarge.status_code(), 400);
        assert_eq!(AdmissionError::ExpiredToken.status_code(), 401);
        assert_eq!(AdmissionError::InsufficientPrivileges.status_code(), 403);
        assert_eq!(
            AdmissionError::RateLimited {
                scope: "tenant",
                retry_after_secs: 30
            }
            .status_code(),
            429
        );
    }

    #[test]
    fn test_diagnostic_header_selection() {
        assert_eq!(
            AdmissionError::MaliciousContent {
                surface: Surface::Body
            }
            .diagnostic_header(),
            "x-validation-error"
        );
        assert_eq!(
            AdmissionError::MalformedToken.diagnostic_header(),
            "x-auth-error"
        );
    }

    #[test]
    fn test_surface_display_never_echoes_payload() {
        let err = AdmissionError::MaliciousContent {
            surface: Surface::Header("user-agent".to_string()),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("header:user-agent"));
    }

    #[test]
    fn test_retry_after_only_for_rate_limits() {
        assert_eq!(AdmissionError::ExpiredToken.retry_after_secs(), None);
        assert_eq!(
            AdmissionError::RateLimited {
                scope: "ip",
                retry_after_secs: 12
            }
            .retry_after_secs(),
            Some(12)
        );
    }
}
