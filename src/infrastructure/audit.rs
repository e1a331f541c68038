//! Audit trail and anomaly detection
//!
//! Every terminal pipeline decision produces one audit event. Emission
//! is best effort: a failing sink is logged and the request proceeds.
//! The anomaly detector counts failures per (ip, kind) inside a sliding
//! window and flags repeat offenders for operators; it never blocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuditConfig;

/// Outcome of one admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Request admitted and forwarded
    Success,
    /// Request rejected by an auth or validation stage
    Failure,
    /// Request rejected by the rate limiter
    Blocked,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure => "failure",
            AuditOutcome::Blocked => "blocked",
        }
    }
}

/// One audit trail entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// User id when authenticated, otherwise the client IP
    pub actor: String,
    pub tenant_id: Option<String>,
    pub client_ip: String,
    /// Failure kind or "ADMITTED"
    pub event_type: String,
    pub method: String,
    pub path: String,
    pub outcome: AuditOutcome,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
}

/// Audit sink contract
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), String>;
}

/// Sink that writes events to the structured log
#[derive(Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), String> {
        info!(
            target: "gatewarden::audit",
            actor = %event.actor,
            tenant_id = event.tenant_id.as_deref().unwrap_or("-"),
            client_ip = %event.client_ip,
            event_type = %event.event_type,
            method = %event.method,
            path = %event.path,
            outcome = event.outcome.as_str(),
            detail = event.detail.as_deref().unwrap_or("-"),
            request_id = %event.request_id,
            "audit"
        );
        Ok(())
    }
}

/// Windowed failure counter keyed by (ip, failure kind)
pub struct AnomalyDetector {
    config: AuditConfig,
    /// (ip, kind) -> failure timestamps within the window
    failures: RwLock<HashMap<(String, String), Vec<i64>>>,
}

impl AnomalyDetector {
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            failures: RwLock::new(HashMap::new()),
        }
    }

    /// Record one failure and return whether the client is now over
    /// the threshold. Informational only.
    pub async fn record_failure(&self, ip: &str, kind: &str) -> bool {
        let now = Utc::now().timestamp();
        let cutoff = now - self.config.anomaly_window_secs as i64;

        let mut failures = self.failures.write().await;
        let entry = failures
            .entry((ip.to_string(), kind.to_string()))
            .or_default();
        entry.retain(|&t| t > cutoff);
        entry.push(now);

        let suspicious = entry.len() as u32 >= self.config.anomaly_threshold;
        if suspicious {
            warn!(
                ip = ip,
                kind = kind,
                count = entry.len(),
                window_secs = self.config.anomaly_window_secs,
                "Repeated admission failures from one client"
            );
        }
        suspicious
    }

    pub async fn is_suspicious(&self, ip: &str, kind: &str) -> bool {
        let now = Utc::now().timestamp();
        let cutoff = now - self.config.anomaly_window_secs as i64;

        let failures = self.failures.read().await;
        failures
            .get(&(ip.to_string(), kind.to_string()))
            .map(|times| times.iter().filter(|&&t| t > cutoff).count() as u32)
            .unwrap_or(0)
            >= self.config.anomaly_threshold
    }

    /// Drop entries whose every timestamp has aged out
    pub async fn cleanup(&self) {
        let now = Utc::now().timestamp();
        let cutoff = now - self.config.anomaly_window_secs as i64;

        let mut failures = self.failures.write().await;
        failures.retain(|_, times| {
            times.retain(|&t| t > cutoff);
            !times.is_empty()
        });
    }
}
