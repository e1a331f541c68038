//! Test data factories and a fully wired in-memory gateway
//!
//! The gateway is assembled from the same components `create_app` uses,
//! but with the stores held open so tests can seed sessions, revoke
//! tokens, and adjust shared state mid-test.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use gatewarden::Config;
use gatewarden::application::AdmissionPipeline;
use gatewarden::domain::claims::{PrincipalClaims, Role};
use gatewarden::domain::routes::RouteTable;
use gatewarden::infrastructure::audit::{AnomalyDetector, TracingAuditSink};
use gatewarden::infrastructure::rate_limit::{HierarchicalRateLimiter, InMemoryCounterStore};
use gatewarden::infrastructure::session::{InMemorySessionStore, SessionGate};
use gatewarden::infrastructure::state::SharedGatewayState;
use gatewarden::infrastructure::token::TokenValidator;
use gatewarden::infrastructure::validation::InputValidator;
use gatewarden::presentation::routes::build_router;

pub const TEST_SECRET: &str = "integration-test-secret-32-chars-min!";

/// Configuration builder for test gateways
pub struct TestConfigBuilder {
    config: Config,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.auth.jwt_secret = TEST_SECRET.to_string();
        Self { config }
    }

    pub fn with_general_capacity(mut self, capacity: u32) -> Self {
        self.config.limits.classes.general.capacity = capacity;
        self
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.config.validation.max_body_bytes = max;
        self
    }

    pub fn with_adaptive_threshold(mut self, threshold: f64) -> Self {
        self.config.limits.adaptive_threshold = threshold;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A wired gateway with its stores exposed for seeding
pub struct TestGateway {
    pub router: Router,
    pub sessions: Arc<InMemorySessionStore>,
    pub state: Arc<SharedGatewayState>,
    pub tokens: TokenValidator,
}

impl TestGateway {
    pub fn with_config(config: Config) -> Self {
        let state = Arc::new(SharedGatewayState::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let tokens = TokenValidator::new(&config.auth.jwt_secret);

        let pipeline = Arc::new(AdmissionPipeline::new(
            RouteTable::new(&config.routes),
            InputValidator::new(config.validation.clone()),
            tokens.clone(),
            SessionGate::new(sessions.clone(), Duration::from_millis(200)),
            HierarchicalRateLimiter::new(
                Arc::new(InMemoryCounterStore::new()),
                Arc::clone(&state),
                config.limits.clone(),
            ),
            Arc::new(TracingAuditSink),
            Arc::new(AnomalyDetector::new(config.audit.clone())),
        ));

        let router = build_router(pipeline, Arc::clone(&state));

        Self {
            router,
            sessions,
            state,
            tokens,
        }
    }

    pub fn new() -> Self {
        Self::with_config(TestConfigBuilder::new().build())
    }

    /// Issue an access token and register its session, like a login
    /// service would have.
    pub async fn login(&self, user_id: &str, tenant_id: &str, session_id: &str, role: Role) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims =
            PrincipalClaims::new_access(user_id, tenant_id, session_id, role, now, now + 3600);
        self.sessions
            .insert_session(session_id, user_id, Duration::from_secs(3600))
            .await;
        self.tokens.issue(&claims).expect("token issuance")
    }

    /// Issue a token that expired an hour ago
    pub fn expired_token(&self, user_id: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = PrincipalClaims::new_access(user_id, "acme", "s-old", Role::User, now - 7200, now - 3600);
        self.tokens.issue(&claims).expect("token issuance")
    }
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}
