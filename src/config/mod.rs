//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub limits: LimitsConfig,
    pub validation: ValidationConfig,
    pub routes: RoutesConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Token validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret used to verify HS256 token signatures
    pub jwt_secret: String,
    /// Timeout for session/blacklist store round-trips (milliseconds)
    pub store_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "development-secret-change-me-in-production!".to_string(),
            store_timeout_ms: 500,
        }
    }
}

/// Capacity and window for a single rate-limit class
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassLimitConfig {
    /// Requests allowed per window at the base (IP) scope
    pub capacity: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for ClassLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 60,
            window_secs: 60,
        }
    }
}

/// Per-class limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassLimitsConfig {
    /// Regular API traffic - highest limits
    pub general: ClassLimitConfig,
    /// Upload-style endpoints - medium limits
    pub upload: ClassLimitConfig,
    /// Auth endpoints (login/refresh) - strictest, never relaxed
    pub auth: ClassLimitConfig,
}

impl Default for ClassLimitsConfig {
    fn default() -> Self {
        Self {
            general: ClassLimitConfig {
                capacity: 120,
                window_secs: 60,
            },
            upload: ClassLimitConfig {
                capacity: 30,
                window_secs: 60,
            },
            auth: ClassLimitConfig {
                capacity: 10,
                window_secs: 60,
            },
        }
    }
}

/// Multipliers applied to the class capacity per cascade scope.
///
/// The IP scope uses the class capacity unchanged; broader scopes admit
/// proportionally more traffic (a tenant aggregates many users, the
/// global scope aggregates every tenant).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeMultipliersConfig {
    pub global: u32,
    pub tenant: u32,
    pub user: u32,
    pub endpoint: u32,
    pub ip: u32,
}

impl Default for ScopeMultipliersConfig {
    fn default() -> Self {
        Self {
            global: 1000,
            tenant: 50,
            user: 5,
            endpoint: 200,
            ip: 1,
        }
    }
}

/// Hierarchical rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub enabled: bool,
    pub classes: ClassLimitsConfig,
    pub scope_multipliers: ScopeMultipliersConfig,
    /// Load factor above which the limit class is escalated
    pub adaptive_threshold: f64,
    /// Timeout for counter store round-trips (milliseconds)
    pub store_timeout_ms: u64,
    /// Seed entries for the IP whitelist: ip -> reason
    pub whitelist_seed: Vec<WhitelistSeedEntry>,
    /// Interval for expired-counter cleanup (seconds)
    pub cleanup_interval_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            classes: ClassLimitsConfig::default(),
            scope_multipliers: ScopeMultipliersConfig::default(),
            adaptive_threshold: 0.8,
            store_timeout_ms: 500,
            whitelist_seed: Vec::new(),
            cleanup_interval_seconds: 300,
        }
    }
}

/// A seed whitelist entry applied at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistSeedEntry {
    pub ip: String,
    pub reason: String,
}

/// Input validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum length of a single header value (bytes)
    pub max_header_len: usize,
    /// Maximum request body size (bytes)
    pub max_body_bytes: usize,
    /// Header names screened for injection patterns. A trailing '*'
    /// makes an entry a prefix rule (e.g. "x-api-*"). Screening every
    /// header would false-positive on cookies and tracing baggage.
    pub screened_headers: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_header_len: 8192,
            max_body_bytes: 1_048_576,
            screened_headers: vec![
                "user-agent".to_string(),
                "referer".to_string(),
                "x-forwarded-for".to_string(),
                "x-real-ip".to_string(),
                "x-api-*".to_string(),
            ],
        }
    }
}

/// Route classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Path prefixes that bypass authentication and rate limiting
    pub public_prefixes: Vec<String>,
    /// Path prefixes that additionally require an admin role
    pub admin_prefixes: Vec<String>,
    /// Health-check paths exempt from deep input validation
    pub health_paths: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            public_prefixes: vec![
                "/health".to_string(),
                "/auth/login".to_string(),
                "/auth/refresh".to_string(),
            ],
            admin_prefixes: vec!["/admin".to_string()],
            health_paths: vec!["/health".to_string(), "/health/live".to_string()],
        }
    }
}

/// Audit sink and anomaly detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Failures from one (ip, kind) pair within the window before the
    /// client is flagged suspicious
    pub anomaly_threshold: u32,
    /// Anomaly counting window (seconds)
    pub anomaly_window_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: 10,
            anomaly_window_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "gatewarden=debug,info")
    pub level: String,
    /// Output format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("GATEWARDEN").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;

        // Validate the loaded configuration
        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
