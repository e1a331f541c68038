//! Gatewarden - API-gateway security and admission-control pipeline
//!
//! Gatewarden decides, for every inbound HTTP request, whether it is
//! well-formed, authenticated, authorized, and within allowed rate
//! budgets before it is forwarded to a backend service.
//!
//! # Modules
//!
//! - [`config`]: Strongly-typed configuration with TOML and environment variable support
//! - [`domain`]: Request context, principal claims, route classification, error taxonomy
//! - [`application`]: The admission pipeline driver
//! - [`infrastructure`]: Token validation, session gate, rate limiting, input validation, audit
//! - [`presentation`]: Axum middleware, error responses, admin routes
//! - [`logging`]: Structured logging with tracing
//!
//! # Architecture
//!
//! ```text
//! gatewarden/
//! ├── domain/           # Pure admission-control types
//! ├── application/      # Pipeline driver composing the stages
//! ├── infrastructure/   # Stores, validators, limiter, audit sink
//! ├── presentation/     # HTTP surface (middleware, routes, models)
//! └── config/           # Configuration management
//! ```
//!
//! Control flow per request:
//!
//! ```text
//! classify -> (public: allow) -> input validation -> token validation
//!          -> session/blacklist gate -> authorization -> rate limiter
//!          -> audit -> forward with identity headers
//! ```
//!
//! Each stage is a pure function of (request, store state); the first
//! failing stage terminates the pipeline with a typed error. The only
//! process-wide mutable state is the IP whitelist and the load factor,
//! both held in [`infrastructure::state::SharedGatewayState`].
//!
//! # Configuration
//!
//! Environment variables use the `GATEWARDEN__` prefix with double
//! underscore separators:
//!
//! ```bash
//! GATEWARDEN__SERVER__PORT=8080
//! GATEWARDEN__LIMITS__ADAPTIVE_THRESHOLD=0.8
//! ```

pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod presentation;

pub use app::{AppHandle, create_app};
pub use config::Config;
pub use logging::init_tracing;
