//! Five-scope cascading rate limiter
//!
//! Each request is evaluated against Global, Tenant, User, Endpoint,
//! and IP counters in that order; the first exhausted scope blocks the
//! request and later scopes are not charged. Whitelisted IPs skip the
//! cascade entirely, and a high load factor escalates the limit class
//! to a stricter one before any counter is touched.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{ClassLimitConfig, LimitsConfig};
use crate::infrastructure::state::SharedGatewayState;

use super::counters::CounterStore;
use super::types::{counter_key, HierarchicalDecision, LimitClass, Scope, ScopeDecision};

/// Per-request identity the limiter derives scope keys from
#[derive(Debug, Clone, Copy)]
pub struct LimiterSubject<'a> {
    pub ip: &'a str,
    pub tenant_id: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub endpoint: &'a str,
}

pub struct HierarchicalRateLimiter {
    counters: Arc<dyn CounterStore>,
    state: Arc<SharedGatewayState>,
    config: LimitsConfig,
    store_timeout: Duration,
}

impl HierarchicalRateLimiter {
    pub fn new(
        counters: Arc<dyn CounterStore>,
        state: Arc<SharedGatewayState>,
        config: LimitsConfig,
    ) -> Self {
        let store_timeout = Duration::from_millis(config.store_timeout_ms);
        Self {
            counters,
            state,
            config,
            store_timeout,
        }
    }

    fn class_limit(&self, class: LimitClass) -> ClassLimitConfig {
        match class {
            LimitClass::General => self.config.classes.general,
            LimitClass::Upload => self.config.classes.upload,
            LimitClass::Auth => self.config.classes.auth,
        }
    }

    fn scope_multiplier(&self, scope: Scope) -> u32 {
        let m = &self.config.scope_multipliers;
        match scope {
            Scope::Global => m.global,
            Scope::Tenant => m.tenant,
            Scope::User => m.user,
            Scope::Endpoint => m.endpoint,
            Scope::Ip => m.ip,
        }
    }

    fn scope_key<'a>(scope: Scope, subject: &LimiterSubject<'a>) -> Option<&'a str> {
        match scope {
            Scope::Global => Some("all"),
            Scope::Tenant => subject.tenant_id,
            Scope::User => subject.user_id,
            Scope::Endpoint => Some(subject.endpoint),
            Scope::Ip => Some(subject.ip),
        }
    }

    /// Evaluate the cascade for one request.
    ///
    /// Counter store failures fail open: a limiter outage must not take
    /// the gateway down with it.
    pub async fn check(
        &self,
        subject: LimiterSubject<'_>,
        requested_class: LimitClass,
    ) -> HierarchicalDecision {
        if !self.config.enabled {
            return HierarchicalDecision {
                allowed: true,
                scopes: Vec::new(),
                blocked_scope: None,
                adaptively_limited: false,
                whitelisted: false,
                class: requested_class,
            };
        }

        // Whitelist wins before any load-driven remapping is considered
        if self.state.is_whitelisted(subject.ip) {
            debug!(ip = %subject.ip, "Whitelisted IP bypasses rate limiting");
            return HierarchicalDecision::whitelisted(requested_class);
        }

        let load = self.state.load_factor();
        let class = if load > self.config.adaptive_threshold {
            requested_class.escalate()
        } else {
            requested_class
        };
        let adaptively_limited = class != requested_class;
        if adaptively_limited {
            debug!(
                load = load,
                from = %requested_class,
                to = %class,
                "Load factor escalated limit class"
            );
        }

        let limit_cfg = self.class_limit(class);
        let window = Duration::from_secs(limit_cfg.window_secs);

        let mut scopes = Vec::with_capacity(Scope::CASCADE.len());
        for scope in Scope::CASCADE {
            let Some(key) = Self::scope_key(scope, &subject) else {
                // Anonymous requests have no tenant/user scope
                continue;
            };

            let limit = limit_cfg.capacity as u64 * self.scope_multiplier(scope) as u64;
            let counter = counter_key(scope, key, class);

            // Bounded like the session gate's store calls, but the
            // policy here is fail open: a hung or broken counter store
            // must not stall or reject admitted traffic
            let increment = self.counters.increment_and_get(&counter, window);
            let count = match tokio::time::timeout(self.store_timeout, increment).await {
                Ok(Ok(count)) => count,
                Ok(Err(e)) => {
                    warn!(scope = %scope, error = %e, "Counter store failed, allowing request");
                    continue;
                }
                Err(_) => {
                    warn!(scope = %scope, "Counter store timed out, allowing request");
                    continue;
                }
            };

            if count.count > limit {
                let retry = count.retry_after_secs();
                scopes.push(ScopeDecision::blocked(scope, count.count, limit, retry));
                return HierarchicalDecision {
                    allowed: false,
                    scopes,
                    blocked_scope: Some(scope),
                    adaptively_limited,
                    whitelisted: false,
                    class,
                };
            }
            scopes.push(ScopeDecision::allowed(scope, count.count, limit));
        }

        HierarchicalDecision {
            allowed: true,
            scopes,
            blocked_scope: None,
            adaptively_limited,
            whitelisted: false,
            class,
        }
    }
}
