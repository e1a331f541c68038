//! Request input validation
//!
//! Size limits, path traversal detection over percent-decoded forms,
//! and pattern screening for injection payloads across every request
//! surface. Pattern hits report the surface only; the hostile payload
//! itself is never echoed back or logged.

use axum::http::HeaderMap;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::warn;

use crate::config::ValidationConfig;
use crate::domain::context::RequestContext;
use crate::domain::errors::{AdmissionError, Surface};

/// One compiled rule family
struct RuleFamily {
    name: &'static str,
    rules: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static validation pattern must compile"))
        .collect()
}

fn rule_families() -> &'static [RuleFamily] {
    static FAMILIES: OnceLock<Vec<RuleFamily>> = OnceLock::new();
    FAMILIES.get_or_init(|| {
        vec![
            RuleFamily {
                name: "sql_injection",
                rules: compile(&[
                    r"(?i)\bunion\b[\s/*]+\bselect\b",
                    r"(?i)\b(select|insert|update|delete|drop|truncate)\b\s+(\*|[a-z_]+)\s+\bfrom\b",
                    r"(?i)('|%27)\s*(or|and)\s+[^=]*=",
                    r"(?i)\b(or|and)\b\s+\d+\s*=\s*\d+",
                    r"(?i);\s*(select|insert|update|delete|drop)\b",
                    r"(?i)\b(sleep|benchmark|pg_sleep|waitfor)\s*\(",
                    r"(?i)--\s*$|#\s*$|/\*.*\*/",
                ]),
            },
            RuleFamily {
                name: "xss",
                rules: compile(&[
                    r"(?i)<\s*script",
                    r"(?i)javascript\s*:",
                    r"(?i)\bon(error|load|click|mouseover|focus|submit)\s*=",
                    r"(?i)<\s*(iframe|object|embed|svg)\b",
                    r"(?i)data\s*:\s*text/html",
                    r"(?i)expression\s*\(",
                ]),
            },
            RuleFamily {
                name: "command_injection",
                rules: compile(&[
                    r"(?i)[;&|`]\s*(cat|ls|id|whoami|wget|curl|nc|bash|sh|python)\b",
                    r"\$\(.+\)",
                    r"(?i)\b(/etc/passwd|/etc/shadow|/proc/self)\b",
                    r"(?i)\|\s*(nc|netcat|telnet)\b",
                    r"`[^`]+`",
                ]),
            },
        ]
    })
}

fn decode_once(input: &str) -> Cow<'_, str> {
    percent_decode_str(input).decode_utf8_lossy()
}

/// Traversal check over the raw form plus one and two rounds of
/// percent decoding, so `%2e%2e` and `%252e%252e` are both caught.
fn has_traversal(input: &str) -> bool {
    if input.contains("..") {
        return true;
    }
    let once = decode_once(input);
    if once.contains("..") {
        return true;
    }
    decode_once(&once).contains("..")
}

fn matches_any_family(input: &str) -> Option<&'static str> {
    for family in rule_families() {
        for rule in &family.rules {
            if rule.is_match(input) {
                return Some(family.name);
            }
        }
    }
    None
}

/// Screen one surface, in raw and once-decoded form.
fn screen(input: &str) -> Option<&'static str> {
    if let Some(family) = matches_any_family(input) {
        return Some(family);
    }
    let decoded = decode_once(input);
    if decoded != input {
        return matches_any_family(&decoded);
    }
    None
}

pub struct InputValidator {
    config: ValidationConfig,
}

impl InputValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.config.max_body_bytes
    }

    /// Whether a header name matches the configured screening rules.
    /// A rule ending in '*' is a prefix match, anything else is exact.
    fn is_screened(&self, name: &str) -> bool {
        self.config
            .screened_headers
            .iter()
            .any(|rule| match rule.strip_suffix('*') {
                Some(prefix) => name.starts_with(prefix),
                None => name == rule,
            })
    }

    /// Validate a request. Size limits apply to every request; the
    /// deep checks (traversal, pattern screening) are skipped for
    /// health probes via `exempt_deep`.
    pub fn validate(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
        body: &[u8],
        exempt_deep: bool,
    ) -> Result<(), AdmissionError> {
        for (name, value) in headers {
            if value.as_bytes().len() > self.config.max_header_len {
                warn!(
                    request_id = %ctx.request_id,
                    header = %name,
                    "Header value over size limit"
                );
                return Err(AdmissionError::HeaderTooLong);
            }
        }

        if body.len() > self.config.max_body_bytes {
            warn!(
                request_id = %ctx.request_id,
                size = body.len(),
                "Request body over size limit"
            );
            return Err(AdmissionError::RequestTooLarge);
        }

        if exempt_deep {
            return Ok(());
        }

        if has_traversal(&ctx.path) {
            warn!(request_id = %ctx.request_id, "Path traversal attempt");
            return Err(AdmissionError::MaliciousContent {
                surface: Surface::Path,
            });
        }
        if let Some(query) = &ctx.query {
            if has_traversal(query) {
                warn!(request_id = %ctx.request_id, "Traversal sequence in query");
                return Err(AdmissionError::MaliciousContent {
                    surface: Surface::Query,
                });
            }
        }

        if let Some(family) = screen(&ctx.path) {
            warn!(request_id = %ctx.request_id, family = family, "Hostile content in path");
            return Err(AdmissionError::MaliciousContent {
                surface: Surface::Path,
            });
        }

        if let Some(query) = &ctx.query {
            if let Some(family) = screen(query) {
                warn!(request_id = %ctx.request_id, family = family, "Hostile content in query");
                return Err(AdmissionError::MaliciousContent {
                    surface: Surface::Query,
                });
            }
        }

        for (name, value) in headers {
            if !self.is_screened(name.as_str()) {
                continue;
            }
            let value = String::from_utf8_lossy(value.as_bytes());
            if let Some(family) = screen(&value) {
                warn!(
                    request_id = %ctx.request_id,
                    header = %name,
                    family = family,
                    "Hostile content in header"
                );
                return Err(AdmissionError::MaliciousContent {
                    surface: Surface::Header(name.as_str().to_string()),
                });
            }
        }

        if !body.is_empty() {
            let text = String::from_utf8_lossy(body);
            if let Some(family) = screen(&text) {
                warn!(request_id = %ctx.request_id, family = family, "Hostile content in body");
                return Err(AdmissionError::MaliciousContent {
                    surface: Surface::Body,
                });
            }
        }

        Ok(())
    }
}
