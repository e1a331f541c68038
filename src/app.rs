//! Application setup and wiring

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::application::AdmissionPipeline;
use crate::config::Config;
use crate::domain::routes::RouteTable;
use crate::infrastructure::audit::{AnomalyDetector, TracingAuditSink};
use crate::infrastructure::rate_limit::{
    CounterStore, HierarchicalRateLimiter, InMemoryCounterStore,
};
use crate::infrastructure::session::{InMemorySessionStore, SessionGate};
use crate::infrastructure::state::SharedGatewayState;
use crate::infrastructure::token::TokenValidator;
use crate::infrastructure::validation::InputValidator;
use crate::presentation::routes::build_router;

/// Handle returned from create_app for graceful shutdown coordination
pub struct AppHandle {
    pub router: Router,
    pub shutdown_token: CancellationToken,
}

/// Periodic store maintenance, cancelled on shutdown
fn spawn_cleanup_worker(
    counters: Arc<dyn CounterStore>,
    anomaly: Arc<AnomalyDetector>,
    interval: Duration,
    shutdown_token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    counters.cleanup().await;
                    anomaly.cleanup().await;
                }
                _ = shutdown_token.cancelled() => {
                    tracing::debug!("Cleanup worker stopped");
                    break;
                }
            }
        }
    });
}

/// Wire stores, shared state, and the pipeline into a ready router.
pub fn create_app(config: Config) -> AppHandle {
    let shutdown_token = CancellationToken::new();

    let state = Arc::new(SharedGatewayState::new());
    for entry in &config.limits.whitelist_seed {
        match entry.ip.parse() {
            Ok(ip) => state.whitelist_add(ip, entry.reason.clone()),
            Err(_) => {
                // Config validation rejects unparseable seeds; reachable
                // only when validation was skipped
                tracing::warn!(ip = %entry.ip, "Skipping unparseable whitelist seed");
            }
        }
    }

    let counters: Arc<InMemoryCounterStore> = Arc::new(InMemoryCounterStore::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let anomaly = Arc::new(AnomalyDetector::new(config.audit.clone()));

    let pipeline = Arc::new(AdmissionPipeline::new(
        RouteTable::new(&config.routes),
        InputValidator::new(config.validation.clone()),
        TokenValidator::new(&config.auth.jwt_secret),
        SessionGate::new(
            sessions,
            Duration::from_millis(config.auth.store_timeout_ms),
        ),
        HierarchicalRateLimiter::new(
            counters.clone(),
            Arc::clone(&state),
            config.limits.clone(),
        ),
        Arc::new(TracingAuditSink),
        Arc::clone(&anomaly),
    ));

    spawn_cleanup_worker(
        counters,
        anomaly,
        Duration::from_secs(config.limits.cleanup_interval_seconds),
        shutdown_token.clone(),
    );

    let router = build_router(pipeline, state);

    AppHandle {
        router,
        shutdown_token,
    }
}
