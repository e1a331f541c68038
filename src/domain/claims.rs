//! Principal claims carried by verified bearer tokens

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role assigned to a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular user role
    User,
    /// Administrator role
    Admin,
    /// Platform-level administrator role
    SuperAdmin,
}

impl Role {
    /// Check if this role passes the admin-only gate
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// Get the role name for logging and injected headers
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "super_admin" | "superadmin" => Ok(Role::SuperAdmin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token type: only access tokens admit protected routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Verified claims extracted from a bearer token.
///
/// Invariant: `exp > iat`. The validator rejects tokens violating this
/// before a `PrincipalClaims` is ever constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalClaims {
    /// Subject (user id)
    pub sub: String,
    /// Tenant the principal belongs to
    pub tenant_id: String,
    /// Session established at login
    pub session_id: String,
    /// Role name, parsed into [`Role`] via `role()`
    pub role: String,
    /// Token type: "access" or "refresh"
    pub typ: TokenKind,
    /// Issued-at timestamp (Unix time)
    pub iat: i64,
    /// Expiration timestamp (Unix time)
    pub exp: i64,
}

impl PrincipalClaims {
    /// Create access-token claims (used by tests and token tooling;
    /// the gateway itself only verifies tokens it did not mint)
    pub fn new_access(
        sub: impl Into<String>,
        tenant_id: impl Into<String>,
        session_id: impl Into<String>,
        role: Role,
        iat: i64,
        exp: i64,
    ) -> Self {
        Self {
            sub: sub.into(),
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            role: role.to_string(),
            typ: TokenKind::Access,
            iat,
            exp,
        }
    }

    /// Parse the role claim
    pub fn role(&self) -> Result<Role, String> {
        Role::from_str(&self.role)
    }

    /// Check if this is an access token
    pub fn is_access_token(&self) -> bool {
        self.typ == TokenKind::Access
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from_str("user").unwrap(), Role::User);
        assert_eq!(Role::from_str("Admin").unwrap(), Role::Admin);
        assert_eq!(Role::from_str("super_admin").unwrap(), Role::SuperAdmin);
        assert_eq!(Role::from_str("SUPERADMIN").unwrap(), Role::SuperAdmin);
        assert!(Role::from_str("root").is_err());
    }

    #[test]
    fn test_admin_gate() {
        assert!(!Role::User.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(Role::SuperAdmin.is_admin());
    }

    #[test]
    fn test_access_token_claims() {
        let now = chrono::Utc::now().timestamp();
        let claims = PrincipalClaims::new_access("u-1", "t-1", "s-1", Role::User, now, now + 3600);
        assert!(claims.is_access_token());
        assert_eq!(claims.role().unwrap(), Role::User);
        assert!(claims.exp > claims.iat);
    }
}
