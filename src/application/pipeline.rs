//! The admission pipeline
//!
//! One explicitly ordered driver runs every stage for every request:
//!
//!   classify -> input validation -> token validation -> session and
//!   blacklist gate -> authorization -> rate limiting -> audit
//!
//! The order is fixed here and nowhere else. The first failing stage is
//! terminal; later stages never run and never charge counters. Public
//! paths short-circuit right after classification.

use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::claims::PrincipalClaims;
use crate::domain::context::RequestContext;
use crate::domain::errors::AdmissionError;
use crate::domain::routes::{RouteCategory, RouteTable};
use crate::infrastructure::audit::{AnomalyDetector, AuditEvent, AuditOutcome, AuditSink};
use crate::infrastructure::rate_limit::{
    HierarchicalDecision, HierarchicalRateLimiter, LimitClass, LimiterSubject,
};
use crate::infrastructure::session::SessionGate;
use crate::infrastructure::token::TokenValidator;
use crate::infrastructure::validation::InputValidator;

/// Outcome of an admitted request, consumed by the forwarding layer
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub category: RouteCategory,
    /// Verified principal; `None` on public paths
    pub principal: Option<PrincipalClaims>,
    /// Rate-limit decision; `None` on public paths
    pub rate_limit: Option<HierarchicalDecision>,
}

pub struct AdmissionPipeline {
    routes: RouteTable,
    validator: InputValidator,
    tokens: TokenValidator,
    sessions: SessionGate,
    limiter: HierarchicalRateLimiter,
    audit: Arc<dyn AuditSink>,
    anomaly: Arc<AnomalyDetector>,
}

impl AdmissionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        routes: RouteTable,
        validator: InputValidator,
        tokens: TokenValidator,
        sessions: SessionGate,
        limiter: HierarchicalRateLimiter,
        audit: Arc<dyn AuditSink>,
        anomaly: Arc<AnomalyDetector>,
    ) -> Self {
        Self {
            routes,
            validator,
            tokens,
            sessions,
            limiter,
            audit,
            anomaly,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.validator.max_body_bytes()
    }

    /// Run the pipeline for one request. Exactly one audit event is
    /// emitted per call, whatever the outcome.
    pub async fn admit(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Admission, AdmissionError> {
        match self.run(ctx, headers, body).await {
            Ok(admission) => {
                self.emit(ctx, &admission.principal, "ADMITTED", AuditOutcome::Success, None);
                Ok(admission)
            }
            Err((err, principal)) => {
                self.anomaly
                    .record_failure(&ctx.client_ip, err.kind())
                    .await;
                let outcome = match err {
                    AdmissionError::RateLimited { .. } => AuditOutcome::Blocked,
                    _ => AuditOutcome::Failure,
                };
                self.emit(ctx, &principal, err.kind(), outcome, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Run the stages in order. Failures after token validation carry
    /// the verified principal so the audit trail names the user, not
    /// just the client IP.
    async fn run(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Admission, (AdmissionError, Option<PrincipalClaims>)> {
        let category = self.routes.classify(&ctx.path);
        debug!(
            request_id = %ctx.request_id,
            path = %ctx.path,
            category = category.as_str(),
            "Request classified"
        );

        if category == RouteCategory::Public {
            return Ok(Admission {
                category,
                principal: None,
                rate_limit: None,
            });
        }

        self.validator
            .validate(ctx, headers, body, self.routes.is_health_path(&ctx.path))
            .map_err(|e| (e, None))?;

        let mut auth_values = headers.get_all("authorization").iter();
        let token = match (auth_values.next(), auth_values.next()) {
            (None, _) => return Err((AdmissionError::MissingToken, None)),
            // Duplicate Authorization headers are ambiguous
            (Some(_), Some(_)) => return Err((AdmissionError::MalformedToken, None)),
            (Some(value), None) => {
                let value = value
                    .to_str()
                    .map_err(|_| (AdmissionError::MalformedToken, None))?;
                TokenValidator::extract_bearer(value).map_err(|e| (e, None))?
            }
        };

        let claims = self
            .tokens
            .validate_access(token)
            .map_err(|e| (e, None))?;

        match self.admit_principal(ctx, category, token, &claims).await {
            Ok(decision) => Ok(Admission {
                category,
                principal: Some(claims),
                rate_limit: Some(decision),
            }),
            Err(e) => Err((e, Some(claims))),
        }
    }

    /// Stages that run with a verified principal: session gate,
    /// authorization, rate limiting.
    async fn admit_principal(
        &self,
        ctx: &RequestContext,
        category: RouteCategory,
        token: &str,
        claims: &PrincipalClaims,
    ) -> Result<HierarchicalDecision, AdmissionError> {
        self.sessions
            .check(token, &claims.session_id, &claims.sub)
            .await?;

        super::authorize::authorize(category, claims)?;

        let endpoint = format!("{} {}", ctx.method, ctx.path);
        let decision = self
            .limiter
            .check(
                LimiterSubject {
                    ip: &ctx.client_ip,
                    tenant_id: Some(&claims.tenant_id),
                    user_id: Some(&claims.sub),
                    endpoint: &endpoint,
                },
                limit_class(&ctx.path),
            )
            .await;

        if !decision.allowed {
            let scope = decision.blocked_scope.map(|s| s.as_str()).unwrap_or("ip");
            let retry_after_secs = decision.retry_after_secs().unwrap_or(1);
            return Err(AdmissionError::RateLimited {
                scope,
                retry_after_secs,
            });
        }

        Ok(decision)
    }

    /// Spawn the audit write; a failing sink never affects admission.
    fn emit(
        &self,
        ctx: &RequestContext,
        principal: &Option<PrincipalClaims>,
        event_type: &str,
        outcome: AuditOutcome,
        detail: Option<String>,
    ) {
        let event = AuditEvent {
            actor: principal
                .as_ref()
                .map(|p| p.sub.clone())
                .unwrap_or_else(|| ctx.client_ip.clone()),
            tenant_id: principal.as_ref().map(|p| p.tenant_id.clone()),
            client_ip: ctx.client_ip.clone(),
            event_type: event_type.to_string(),
            method: ctx.method.to_string(),
            path: ctx.path.clone(),
            outcome,
            detail,
            timestamp: chrono::Utc::now(),
            request_id: ctx.request_id,
        };

        let sink = Arc::clone(&self.audit);
        tokio::spawn(async move {
            if let Err(e) = sink.record(&event).await {
                tracing::debug!(error = %e, "Audit write failed");
            }
        });
    }
}

/// Limit class by path shape. Auth-flavored endpoints get the strictest
/// class, upload endpoints a reduced one, everything else General.
fn limit_class(path: &str) -> LimitClass {
    if path == "/auth" || path.starts_with("/auth/") {
        LimitClass::Auth
    } else if path.contains("/upload") {
        LimitClass::Upload
    } else {
        LimitClass::General
    }
}
