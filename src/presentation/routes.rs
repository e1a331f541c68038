//! Route configuration and handlers
//!
//! Health probes, the administrative surface (whitelist and load
//! factor), and an echo-style forward target standing in for the
//! backend services a deployment would proxy to. The admission
//! middleware wraps every route; admin handlers are only reachable by
//! principals the pipeline admitted on an admin-only path.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, put},
};
use chrono::Utc;
use serde_json::json;
use std::net::IpAddr;
use std::sync::Arc;

use crate::application::AdmissionPipeline;
use crate::infrastructure::state::SharedGatewayState;
use crate::presentation::middleware::{
    admission_middleware, logging_middleware, security_headers_middleware,
};
use crate::presentation::models::{
    HealthResponse, LoadFactorRequest, LoadFactorResponse, WhitelistAddRequest, WhitelistEntry,
};

/// Shared state for route handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SharedGatewayState>,
}

/// Build the gateway router with the admission middleware applied to
/// every route.
pub fn build_router(pipeline: Arc<AdmissionPipeline>, gateway: Arc<SharedGatewayState>) -> Router {
    let state = AppState { gateway };

    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(health_check))
        .route(
            "/admin/whitelist",
            get(whitelist_list).post(whitelist_add),
        )
        .route("/admin/whitelist/{ip}", delete(whitelist_remove))
        .route("/admin/load-factor", put(load_factor_update))
        .fallback(forward_target)
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            pipeline,
            admission_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

async fn whitelist_list(State(state): State<AppState>) -> Json<Vec<WhitelistEntry>> {
    let entries = state
        .gateway
        .whitelist_entries()
        .into_iter()
        .map(|(ip, reason)| WhitelistEntry {
            ip: ip.to_string(),
            reason,
        })
        .collect();
    Json(entries)
}

async fn whitelist_add(
    State(state): State<AppState>,
    Json(request): Json<WhitelistAddRequest>,
) -> impl IntoResponse {
    let ip: IpAddr = match request.ip.parse() {
        Ok(ip) => ip,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "INVALID_IP", "message": "Not a valid IP address" })),
            );
        }
    };

    state.gateway.whitelist_add(ip, request.reason.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "ip": ip.to_string(), "reason": request.reason })),
    )
}

async fn whitelist_remove(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> impl IntoResponse {
    let ip: IpAddr = match ip.parse() {
        Ok(ip) => ip,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "INVALID_IP", "message": "Not a valid IP address" })),
            );
        }
    };

    match state.gateway.whitelist_remove(&ip) {
        Some(reason) => (
            StatusCode::OK,
            Json(json!({ "ip": ip.to_string(), "reason": reason })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "NOT_FOUND", "message": "IP is not whitelisted" })),
        ),
    }
}

async fn load_factor_update(
    State(state): State<AppState>,
    Json(request): Json<LoadFactorRequest>,
) -> Json<LoadFactorResponse> {
    state.gateway.set_load_factor(request.load_factor);
    Json(LoadFactorResponse {
        load_factor: state.gateway.load_factor(),
    })
}

/// Echo-style stand-in for the proxied backend. Reflects the identity
/// headers the middleware injected so integration tests can assert on
/// the forwarded request.
async fn forward_target(headers: HeaderMap, request: axum::extract::Request) -> impl IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    Json(json!({
        "forwarded": true,
        "method": request.method().as_str(),
        "path": request.uri().path(),
        "userId": header("x-auth-user-id"),
        "tenantId": header("x-auth-tenant-id"),
        "role": header("x-auth-role"),
        "sessionId": header("x-auth-session-id"),
        "requestId": header("x-request-id"),
    }))
}
