//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error body returned for every rejected request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable failure kind (e.g. "EXPIRED_TOKEN")
    pub error: String,
    /// Human-readable message; never echoes request content
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// One IP whitelist entry
#[derive(Debug, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub ip: String,
    pub reason: String,
}

/// Request body for adding a whitelist entry
#[derive(Debug, Deserialize)]
pub struct WhitelistAddRequest {
    pub ip: String,
    pub reason: String,
}

/// Request body for updating the load factor
#[derive(Debug, Deserialize)]
pub struct LoadFactorRequest {
    pub load_factor: f64,
}

/// Current load factor
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadFactorResponse {
    pub load_factor: f64,
}
