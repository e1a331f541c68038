//! Rate limiter types and core data structures

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Cascade scope, evaluated in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Tenant,
    User,
    Endpoint,
    Ip,
}

impl Scope {
    /// Strict cascade order: broadest scope first
    pub const CASCADE: [Scope; 5] = [
        Scope::Global,
        Scope::Tenant,
        Scope::User,
        Scope::Endpoint,
        Scope::Ip,
    ];

    /// Get the scope name for keys, logging, and decisions
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Tenant => "tenant",
            Scope::User => "user",
            Scope::Endpoint => "endpoint",
            Scope::Ip => "ip",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rate-limit class a request is evaluated under.
///
/// Ordered from most permissive to strictest; adaptive escalation only
/// ever moves a request to a stricter class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitClass {
    /// Regular API traffic
    General,
    /// Upload-style endpoints
    Upload,
    /// Auth endpoints; security-sensitive, never remapped
    Auth,
}

impl LimitClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitClass::General => "general",
            LimitClass::Upload => "upload",
            LimitClass::Auth => "auth",
        }
    }

    /// The strictly more restrictive class this one degrades to under
    /// high load. Auth is already the strictest and stays put.
    pub fn escalate(&self) -> LimitClass {
        match self {
            LimitClass::General => LimitClass::Upload,
            LimitClass::Upload => LimitClass::Auth,
            LimitClass::Auth => LimitClass::Auth,
        }
    }
}

impl std::fmt::Display for LimitClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counter key for one (scope, scope-key, class) combination. The
/// store appends the window boundary to make the full window key.
pub fn counter_key(scope: Scope, scope_key: &str, class: LimitClass) -> String {
    format!("ratelimit:{}:{}:{}", scope.as_str(), scope_key, class.as_str())
}

/// Outcome of a single scope check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeDecision {
    pub scope: Scope,
    pub allowed: bool,
    /// Count observed in the current window (including this request)
    pub count: u64,
    /// Effective limit for this scope and class
    pub limit: u64,
    /// Seconds until the window resets (only meaningful when blocked)
    pub retry_after_secs: u64,
    pub reason: String,
}

impl ScopeDecision {
    pub fn allowed(scope: Scope, count: u64, limit: u64) -> Self {
        Self {
            scope,
            allowed: true,
            count,
            limit,
            retry_after_secs: 0,
            reason: String::new(),
        }
    }

    pub fn blocked(scope: Scope, count: u64, limit: u64, retry_after_secs: u64) -> Self {
        Self {
            scope,
            allowed: false,
            count,
            limit,
            retry_after_secs,
            reason: format!(
                "{} scope exhausted: {} of {} requests in the current window",
                scope, count, limit
            ),
        }
    }
}

/// Aggregate decision across the cascade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchicalDecision {
    pub allowed: bool,
    /// Per-scope decisions, in cascade order up to the blocking scope
    pub scopes: Vec<ScopeDecision>,
    /// Scope that blocked the request, if any
    pub blocked_scope: Option<Scope>,
    /// True when load-driven escalation changed the effective class
    pub adaptively_limited: bool,
    /// True when the whitelist skipped the cascade entirely
    pub whitelisted: bool,
    /// Class the cascade was evaluated under
    pub class: LimitClass,
}

impl HierarchicalDecision {
    pub fn whitelisted(class: LimitClass) -> Self {
        Self {
            allowed: true,
            scopes: Vec::new(),
            blocked_scope: None,
            adaptively_limited: false,
            whitelisted: true,
            class,
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        self.scopes
            .iter()
            .find(|s| !s.allowed)
            .map(|s| s.retry_after_secs)
    }

    /// Tightest remaining budget across evaluated scopes, for
    /// rate-limit response headers.
    pub fn remaining(&self) -> Option<u64> {
        self.scopes
            .iter()
            .map(|s| s.limit.saturating_sub(s.count))
            .min()
    }

    /// Limit of the scope with the tightest remaining budget
    pub fn limit(&self) -> Option<u64> {
        self.scopes
            .iter()
            .min_by_key(|s| s.limit.saturating_sub(s.count))
            .map(|s| s.limit)
    }
}

/// Get current time in seconds since Unix epoch
pub fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_order() {
        assert_eq!(
            Scope::CASCADE,
            [
                Scope::Global,
                Scope::Tenant,
                Scope::User,
                Scope::Endpoint,
                Scope::Ip
            ]
        );
    }

    #[test]
    fn test_escalation_is_monotone() {
        assert_eq!(LimitClass::General.escalate(), LimitClass::Upload);
        assert_eq!(LimitClass::Upload.escalate(), LimitClass::Auth);
        // The most security-sensitive class is never relaxed
        assert_eq!(LimitClass::Auth.escalate(), LimitClass::Auth);
    }

    #[test]
    fn test_counter_key_shape() {
        assert_eq!(
            counter_key(Scope::Tenant, "acme", LimitClass::General),
            "ratelimit:tenant:acme:general"
        );
    }

    #[test]
    fn test_remaining_uses_tightest_scope() {
        let decision = HierarchicalDecision {
            allowed: true,
            scopes: vec![
                ScopeDecision::allowed(Scope::Global, 10, 1000),
                ScopeDecision::allowed(Scope::Ip, 58, 60),
            ],
            blocked_scope: None,
            adaptively_limited: false,
            whitelisted: false,
            class: LimitClass::General,
        };
        assert_eq!(decision.remaining(), Some(2));
        assert_eq!(decision.limit(), Some(60));
    }

    #[test]
    fn test_blocked_reason_names_scope() {
        let d = ScopeDecision::blocked(Scope::Tenant, 51, 50, 12);
        assert!(d.reason.contains("tenant"));
        assert_eq!(d.retry_after_secs, 12);
    }
}
