//! External integrations and security services

pub mod audit;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod token;
pub mod validation;
