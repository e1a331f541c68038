//! Configuration validation module

use crate::config::{
    AuditConfig, AuthConfig, Config, LimitsConfig, RoutesConfig, ServerConfig, ValidationConfig,
};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Authentication configuration error: {message}")]
    Auth { message: String },

    #[error("Rate limit configuration error: {message}")]
    Limits { message: String },

    #[error("Input validation configuration error: {message}")]
    Validation { message: String },

    #[error("Route configuration error: {message}")]
    Routes { message: String },

    #[error("Audit configuration error: {message}")]
    Audit { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn limits(message: impl Into<String>) -> Self {
        Self::Limits {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn routes(message: impl Into<String>) -> Self {
        Self::Routes {
            message: message.into(),
        }
    }

    pub fn audit(message: impl Into<String>) -> Self {
        Self::Audit {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.host.is_empty() {
            return Err(ValidationError::server("host must not be empty"));
        }
        if self.port == 0 {
            return Err(ValidationError::server("port must be non-zero"));
        }
        Ok(())
    }
}

impl Validate for AuthConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.jwt_secret.len() < 32 {
            return Err(ValidationError::auth(
                "jwt_secret must be at least 32 characters",
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err(ValidationError::auth("store_timeout_ms must be non-zero"));
        }
        Ok(())
    }
}

impl Validate for LimitsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.adaptive_threshold) {
            return Err(ValidationError::limits(
                "adaptive_threshold must be within [0.0, 1.0]",
            ));
        }
        for (name, class) in [
            ("general", &self.classes.general),
            ("upload", &self.classes.upload),
            ("auth", &self.classes.auth),
        ] {
            if class.capacity == 0 {
                return Err(ValidationError::limits(format!(
                    "class '{}' capacity must be non-zero",
                    name
                )));
            }
            if class.window_secs == 0 {
                return Err(ValidationError::limits(format!(
                    "class '{}' window_secs must be non-zero",
                    name
                )));
            }
        }
        if self.store_timeout_ms == 0 {
            return Err(ValidationError::limits("store_timeout_ms must be non-zero"));
        }
        let m = &self.scope_multipliers;
        if [m.global, m.tenant, m.user, m.endpoint, m.ip]
            .iter()
            .any(|&v| v == 0)
        {
            return Err(ValidationError::limits(
                "scope multipliers must all be non-zero",
            ));
        }
        for entry in &self.whitelist_seed {
            if entry.ip.parse::<std::net::IpAddr>().is_err() {
                return Err(ValidationError::limits(format!(
                    "whitelist seed entry '{}' is not a valid IP address",
                    entry.ip
                )));
            }
        }
        Ok(())
    }
}

impl Validate for ValidationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_header_len == 0 {
            return Err(ValidationError::validation(
                "max_header_len must be non-zero",
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(ValidationError::validation(
                "max_body_bytes must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Validate for RoutesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for prefix in self
            .public_prefixes
            .iter()
            .chain(self.admin_prefixes.iter())
            .chain(self.health_paths.iter())
        {
            if !prefix.starts_with('/') {
                return Err(ValidationError::routes(format!(
                    "path prefix '{}' must start with '/'",
                    prefix
                )));
            }
        }
        Ok(())
    }
}

impl Validate for AuditConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.anomaly_threshold == 0 {
            return Err(ValidationError::audit("anomaly_threshold must be non-zero"));
        }
        if self.anomaly_window_secs == 0 {
            return Err(ValidationError::audit(
                "anomaly_window_secs must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.limits.validate()?;
        self.validation.validate()?;
        self.routes.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}
