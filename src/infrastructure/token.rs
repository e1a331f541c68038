//! Bearer token validation
//!
//! Verifies signature, expiry, and claim shape of tokens the gateway did
//! not mint. Side-effect free; failure modes are distinguished so the
//! pipeline can produce precise audit records and client-facing codes.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::claims::{PrincipalClaims, TokenKind};
use crate::domain::errors::AdmissionError;

/// Raw claim shape before presence checks
#[derive(Debug, Serialize, Deserialize)]
struct RawClaims {
    sub: Option<String>,
    tenant_id: Option<String>,
    session_id: Option<String>,
    role: Option<String>,
    typ: Option<String>,
    iat: Option<i64>,
    exp: i64,
}

/// HS256 token validator
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
}

impl TokenValidator {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Extract the credential from an `Authorization` header value.
    ///
    /// The header must be exactly `Bearer <token>`: one scheme, one
    /// token, no trailing data. Anything else is malformed.
    pub fn extract_bearer(header_value: &str) -> Result<&str, AdmissionError> {
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(AdmissionError::MalformedToken)?;

        if token.is_empty() || token.contains(char::is_whitespace) {
            return Err(AdmissionError::MalformedToken);
        }

        Ok(token)
    }

    /// Validate a token and return its verified claims.
    pub fn validate(&self, token: &str) -> Result<PrincipalClaims, AdmissionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let raw = decode::<RawClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token validation failed");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AdmissionError::ExpiredToken
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature
                    | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                        AdmissionError::InvalidSignature
                    }
                    jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_) => {
                        AdmissionError::MissingClaims
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken
                    | jsonwebtoken::errors::ErrorKind::Base64(_)
                    | jsonwebtoken::errors::ErrorKind::Json(_)
                    | jsonwebtoken::errors::ErrorKind::Utf8(_) => AdmissionError::MalformedToken,
                    _ => AdmissionError::TokenValidation,
                }
            })?;

        Self::check_shape(raw)
    }

    /// Validate a token for protected-route admission: everything
    /// `validate` checks, plus the access-token requirement.
    pub fn validate_access(&self, token: &str) -> Result<PrincipalClaims, AdmissionError> {
        let claims = self.validate(token)?;
        if !claims.is_access_token() {
            tracing::debug!("Refresh token presented on a protected route");
            return Err(AdmissionError::TokenValidation);
        }
        Ok(claims)
    }

    fn check_shape(raw: RawClaims) -> Result<PrincipalClaims, AdmissionError> {
        let sub = raw.sub.filter(|v| !v.is_empty());
        let tenant_id = raw.tenant_id.filter(|v| !v.is_empty());
        let session_id = raw.session_id.filter(|v| !v.is_empty());
        let role = raw.role.filter(|v| !v.is_empty());

        let (Some(sub), Some(tenant_id), Some(session_id), Some(role)) =
            (sub, tenant_id, session_id, role)
        else {
            return Err(AdmissionError::MissingClaims);
        };

        let typ = match raw.typ.as_deref() {
            Some("access") => TokenKind::Access,
            Some("refresh") => TokenKind::Refresh,
            _ => return Err(AdmissionError::MissingClaims),
        };

        let iat = raw.iat.ok_or(AdmissionError::MissingClaims)?;
        if raw.exp <= iat {
            // exp > iat invariant; such a token was mis-minted
            return Err(AdmissionError::TokenValidation);
        }

        Ok(PrincipalClaims {
            sub,
            tenant_id,
            session_id,
            role,
            typ,
            iat,
            exp: raw.exp,
        })
    }

    /// Encode claims into a signed token. The gateway only verifies
    /// tokens in production; this exists for tests and local tooling.
    pub fn issue(&self, claims: &PrincipalClaims) -> Result<String, AdmissionError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode token");
            AdmissionError::TokenValidation
        })
    }
}
