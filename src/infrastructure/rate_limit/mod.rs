//! Hierarchical rate limiting
//!
//! A five-scope cascading limiter (Global, Tenant, User, Endpoint, IP)
//! over fixed-window counters in an external store, with IP
//! whitelisting and load-driven class escalation.

pub mod counters;
pub mod hierarchical;
pub mod types;

pub use counters::{CounterStore, InMemoryCounterStore, WindowCount};
pub use hierarchical::{HierarchicalRateLimiter, LimiterSubject};
pub use types::{HierarchicalDecision, LimitClass, Scope, ScopeDecision};
