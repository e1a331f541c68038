//! Session and blacklist gate
//!
//! Consults an external revocation set and active-session registry.
//! Both checks fail closed: a store timeout or error denies the request.
//! The session-activity touch is best effort and never fails a request.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::errors::AdmissionError;

/// External session/blacklist store contract
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Check whether a token (by hash) has been revoked
    async fn is_blacklisted(&self, token_hash: &str) -> Result<bool, String>;

    /// Check for a matching, non-expired session entry
    async fn is_session_valid(&self, session_id: &str, user_id: &str) -> Result<bool, String>;

    /// Update session last-activity (best effort)
    async fn touch_session(&self, session_id: &str) -> Result<(), String>;
}

/// Gate wrapping the store with bounded timeouts and the fail-closed /
/// fail-open policy split.
pub struct SessionGate {
    store: Arc<dyn SessionStore>,
    timeout: Duration,
}

impl SessionGate {
    pub fn new(store: Arc<dyn SessionStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// SHA-256 hash of the raw token, used as the blacklist key so the
    /// credential itself never reaches the store.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Run the blacklist and session checks for a verified principal.
    ///
    /// On success a fire-and-forget last-activity touch is spawned;
    /// its failure never surfaces to the caller.
    pub async fn check(
        &self,
        token: &str,
        session_id: &str,
        user_id: &str,
    ) -> Result<(), AdmissionError> {
        let token_hash = Self::hash_token(token);

        // Fail closed: uncertainty about revocation denies the request
        match tokio::time::timeout(self.timeout, self.store.is_blacklisted(&token_hash)).await {
            Ok(Ok(false)) => {}
            Ok(Ok(true)) => return Err(AdmissionError::BlacklistedToken),
            Ok(Err(e)) => {
                warn!(error = %e, "Blacklist check failed, denying request");
                return Err(AdmissionError::BlacklistedToken);
            }
            Err(_) => {
                warn!("Blacklist check timed out, denying request");
                return Err(AdmissionError::BlacklistedToken);
            }
        }

        match tokio::time::timeout(
            self.timeout,
            self.store.is_session_valid(session_id, user_id),
        )
        .await
        {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => return Err(AdmissionError::InvalidSession),
            Ok(Err(e)) => {
                warn!(error = %e, "Session check failed, denying request");
                return Err(AdmissionError::InvalidSession);
            }
            Err(_) => {
                warn!("Session check timed out, denying request");
                return Err(AdmissionError::InvalidSession);
            }
        }

        // Fail open: activity tracking must never block the pipeline
        let store = Arc::clone(&self.store);
        let session_id = session_id.to_string();
        let touch_timeout = self.timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(touch_timeout, store.touch_session(&session_id)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "Session touch failed"),
                Err(_) => debug!("Session touch timed out"),
            }
        });

        Ok(())
    }
}

/// In-memory store for development and tests
#[derive(Default)]
pub struct InMemorySessionStore {
    blacklist: RwLock<HashSet<String>>,
    /// session_id -> (user_id, expires_at unix seconds)
    sessions: RwLock<HashMap<String, (String, i64)>>,
    /// session_id -> last-activity unix seconds
    activity: RwLock<HashMap<String, i64>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn blacklist_token_hash(&self, token_hash: impl Into<String>) {
        self.blacklist.write().await.insert(token_hash.into());
    }

    pub async fn insert_session(
        &self,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        ttl: Duration,
    ) {
        let expires_at = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
        self.sessions
            .write()
            .await
            .insert(session_id.into(), (user_id.into(), expires_at));
    }

    pub async fn last_activity(&self, session_id: &str) -> Option<i64> {
        self.activity.read().await.get(session_id).copied()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn is_blacklisted(&self, token_hash: &str) -> Result<bool, String> {
        Ok(self.blacklist.read().await.contains(token_hash))
    }

    async fn is_session_valid(&self, session_id: &str, user_id: &str) -> Result<bool, String> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some((owner, expires_at)) => {
                Ok(owner == user_id && *expires_at > chrono::Utc::now().timestamp())
            }
            None => Ok(false),
        }
    }

    async fn touch_session(&self, session_id: &str) -> Result<(), String> {
        self.activity
            .write()
            .await
            .insert(session_id.to_string(), chrono::Utc::now().timestamp());
        Ok(())
    }
}
