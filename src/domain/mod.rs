//! Core domain types for the admission pipeline

pub mod claims;
pub mod context;
pub mod errors;
pub mod routes;

pub use claims::{PrincipalClaims, Role, TokenKind};
pub use context::RequestContext;
pub use errors::AdmissionError;
pub use routes::{RouteCategory, RouteTable};
