//! Per-request context constructed once at the pipeline entry

use axum::http::{HeaderMap, Method};
use uuid::Uuid;

/// Identity bag built for every inbound request.
///
/// Immutable once constructed; stages only read from it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Client IP derived from forwarding headers (first hop wins)
    pub client_ip: String,
    /// Request id taken from `x-request-id` or generated
    pub request_id: Uuid,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
}

impl RequestContext {
    /// Build the context from request parts.
    pub fn from_parts(method: &Method, path: &str, query: Option<&str>, headers: &HeaderMap) -> Self {
        Self {
            client_ip: extract_client_ip(headers),
            request_id: extract_request_id(headers),
            method: method.clone(),
            path: path.to_string(),
            query: query.map(|q| q.to_string()),
        }
    }
}

/// Extract the client IP with first-hop precedence: the first entry of
/// `x-forwarded-for`, then `x-real-ip`, else "unknown".
fn extract_client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn extract_request_id(headers: &HeaderMap) -> Uuid {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or_else(Uuid::new_v4)
}
