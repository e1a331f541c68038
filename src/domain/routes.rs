//! Endpoint classification by path prefix

use crate::config::RoutesConfig;

/// Category a request path falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteCategory {
    /// Bypasses all downstream checks except audit logging
    Public,
    /// Requires authentication and rate limiting
    Protected,
    /// Additionally requires an admin role
    AdminOnly,
}

impl RouteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteCategory::Public => "public",
            RouteCategory::Protected => "protected",
            RouteCategory::AdminOnly => "admin_only",
        }
    }
}

/// Prefix-based route classifier.
///
/// When both a public and an admin prefix match, the most specific
/// (longest) prefix wins. Unmatched paths default to Protected.
#[derive(Debug, Clone)]
pub struct RouteTable {
    public_prefixes: Vec<String>,
    admin_prefixes: Vec<String>,
    health_paths: Vec<String>,
}

impl RouteTable {
    pub fn new(config: &RoutesConfig) -> Self {
        Self {
            public_prefixes: config.public_prefixes.clone(),
            admin_prefixes: config.admin_prefixes.clone(),
            health_paths: config.health_paths.clone(),
        }
    }

    /// Classify a request path. Pure; no side effects.
    pub fn classify(&self, path: &str) -> RouteCategory {
        let public_len = longest_matching_prefix(&self.public_prefixes, path);
        let admin_len = longest_matching_prefix(&self.admin_prefixes, path);

        match (public_len, admin_len) {
            (Some(p), Some(a)) if p >= a => RouteCategory::Public,
            (_, Some(_)) => RouteCategory::AdminOnly,
            (Some(_), None) => RouteCategory::Public,
            (None, None) => RouteCategory::Protected,
        }
    }

    /// Health-check paths are exempt from deep input validation
    pub fn is_health_path(&self, path: &str) -> bool {
        self.health_paths.iter().any(|p| p == path)
    }
}

/// Returns the length of the longest configured prefix matching `path`,
/// honoring path-segment boundaries ("/admin" matches "/admin/users"
/// but not "/administrator").
fn longest_matching_prefix(prefixes: &[String], path: &str) -> Option<usize> {
    prefixes
        .iter()
        .filter(|prefix| {
            path == prefix.as_str()
                || (path.starts_with(prefix.as_str())
                    && path.as_bytes().get(prefix.len()) == Some(&b'/'))
        })
        .map(|prefix| prefix.len())
        .max()
}
