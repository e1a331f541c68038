//! Process-wide shared state: IP whitelist and load factor
//!
//! The only mutable state shared across in-flight requests. Reads are
//! cheap on the hot path; writes come from administrative and
//! monitoring paths. Injected into the pipeline rather than held as an
//! ambient global.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared gateway state
#[derive(Debug, Default)]
pub struct SharedGatewayState {
    /// ip -> reason; entries never expire automatically
    whitelist: RwLock<HashMap<IpAddr, String>>,
    /// System load in [0.0, 1.0], stored as f64 bits
    load_factor: AtomicU64,
}

impl SharedGatewayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an IP to the whitelist, replacing any previous reason.
    pub fn whitelist_add(&self, ip: IpAddr, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(ip = %ip, reason = %reason, "IP added to whitelist");
        self.whitelist.write().insert(ip, reason);
    }

    /// Remove an IP from the whitelist. Returns the removed reason.
    pub fn whitelist_remove(&self, ip: &IpAddr) -> Option<String> {
        let removed = self.whitelist.write().remove(ip);
        if removed.is_some() {
            tracing::info!(ip = %ip, "IP removed from whitelist");
        }
        removed
    }

    /// Consulted on every request. Unparseable client IPs (e.g.
    /// "unknown") are never whitelisted.
    pub fn is_whitelisted(&self, ip: &str) -> bool {
        match ip.parse::<IpAddr>() {
            Ok(addr) => self.whitelist.read().contains_key(&addr),
            Err(_) => false,
        }
    }

    /// Snapshot of the whitelist for the admin surface
    pub fn whitelist_entries(&self) -> Vec<(IpAddr, String)> {
        self.whitelist
            .read()
            .iter()
            .map(|(ip, reason)| (*ip, reason.clone()))
            .collect()
    }

    /// Update the load factor, clamped to [0.0, 1.0].
    pub fn set_load_factor(&self, value: f64) {
        let clamped = value.clamp(0.0, 1.0);
        self.load_factor.store(clamped.to_bits(), Ordering::Release);
    }

    pub fn load_factor(&self) -> f64 {
        f64::from_bits(self.load_factor.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist_round_trip() {
        let state = SharedGatewayState::new();
        let ip: IpAddr = "10.0.0.9".parse().unwrap();

        assert!(!state.is_whitelisted("10.0.0.9"));
        state.whitelist_add(ip, "load test client");
        assert!(state.is_whitelisted("10.0.0.9"));

        assert_eq!(
            state.whitelist_remove(&ip),
            Some("load test client".to_string())
        );
        assert!(!state.is_whitelisted("10.0.0.9"));
    }

    #[test]
    fn test_unparseable_ip_never_whitelisted() {
        let state = SharedGatewayState::new();
        assert!(!state.is_whitelisted("unknown"));
        assert!(!state.is_whitelisted(""));
    }

    #[test]
    fn test_load_factor_clamped() {
        let state = SharedGatewayState::new();
        assert_eq!(state.load_factor(), 0.0);

        state.set_load_factor(0.75);
        assert_eq!(state.load_factor(), 0.75);

        state.set_load_factor(3.0);
        assert_eq!(state.load_factor(), 1.0);

        state.set_load_factor(-1.0);
        assert_eq!(state.load_factor(), 0.0);
    }
}
