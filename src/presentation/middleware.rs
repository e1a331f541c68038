//! HTTP middleware wiring the admission pipeline into axum
//!
//! The admission middleware buffers the body up to the configured cap,
//! runs the pipeline, and either forwards the request with injected
//! identity headers or answers with the typed error response.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::application::AdmissionPipeline;
use crate::domain::context::RequestContext;
use crate::domain::errors::AdmissionError;
use crate::presentation::models::ErrorResponse;

/// Convert a terminal admission error into the client-facing response.
///
/// The body carries the failure kind and a generic message; the
/// diagnostic header (`x-auth-error` or `x-validation-error`) names the
/// kind for clients that only look at headers.
pub fn admission_error_to_response(error: &AdmissionError, request_id: Uuid) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    tracing::warn!(
        request_id = %request_id,
        error = %error,
        http_status = %status,
        error_code = error.kind(),
        "Request rejected"
    );

    let body = ErrorResponse {
        error: error.kind().to_string(),
        message: error.to_string(),
        timestamp: Utc::now(),
        request_id,
    };

    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    if let Ok(kind) = HeaderValue::from_str(error.kind()) {
        headers.insert(error.diagnostic_header(), kind);
    }
    if let Some(retry) = error.retry_after_secs() {
        if let Ok(value) = HeaderValue::from_str(&retry.to_string()) {
            headers.insert("retry-after", value);
        }
    }
    if let Ok(id) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert("x-request-id", id);
    }
    response
}

/// Admission middleware: every request to a non-admin route passes
/// through here before reaching the forward target.
pub async fn admission_middleware(
    State(pipeline): State<Arc<AdmissionPipeline>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let ctx = RequestContext::from_parts(
        &parts.method,
        parts.uri.path(),
        parts.uri.query(),
        &parts.headers,
    );

    // Buffer the body up to the cap; an oversized stream is rejected
    // without reading the rest
    let body = match axum::body::to_bytes(body, pipeline.max_body_bytes()).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return admission_error_to_response(&AdmissionError::RequestTooLarge, ctx.request_id);
        }
    };

    let admission = match pipeline.admit(&ctx, &parts.headers, &body).await {
        Ok(admission) => admission,
        Err(err) => return admission_error_to_response(&err, ctx.request_id),
    };

    // Strip inbound spoofs of the injected headers, then re-inject
    for name in [
        "x-auth-user-id",
        "x-auth-tenant-id",
        "x-auth-role",
        "x-auth-session-id",
    ] {
        parts.headers.remove(name);
    }
    if let Some(principal) = &admission.principal {
        insert_header(&mut parts.headers, "x-auth-user-id", &principal.sub);
        insert_header(&mut parts.headers, "x-auth-tenant-id", &principal.tenant_id);
        insert_header(&mut parts.headers, "x-auth-role", &principal.role);
        insert_header(&mut parts.headers, "x-auth-session-id", &principal.session_id);
    }
    insert_header(
        &mut parts.headers,
        "x-request-id",
        &ctx.request_id.to_string(),
    );

    let request = Request::from_parts(parts, Body::from(body));
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if let Some(decision) = &admission.rate_limit {
        if let (Some(limit), Some(remaining)) = (decision.limit(), decision.remaining()) {
            if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                headers.insert("x-ratelimit-limit", value);
            }
            if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
                headers.insert("x-ratelimit-remaining", value);
            }
        }
    }
    if let Ok(id) = HeaderValue::from_str(&ctx.request_id.to_string()) {
        headers.insert("x-request-id", id);
    }

    response
}

fn insert_header(headers: &mut axum::http::HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    response
}

/// Request logging middleware with timing
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start_time = Instant::now();

    let response = next.run(request).await;
    let duration = start_time.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}
