//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (entropy sizes, rate limits)
//! - Check that allowlist entries parse as addresses or ranges
//! - Detect decoy paths that collide with the admin namespace
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderName;

use crate::config::schema::GateConfig;
use crate::security::allowlist::parse_network;

/// Minimum random bytes for the secret path and token (80 bits).
pub const MIN_SECRET_BYTES: usize = 10;

/// Longest accepted rate-limit window (30 days).
pub const MAX_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("gate.namespace '{0}' must start with '/', must not end with '/' and must not be '/'")]
    Namespace(String),
    #[error("gate.token_header '{0}' is not a valid header name")]
    TokenHeader(String),
    #[error("gate.{field} must be at least {MIN_SECRET_BYTES} bytes, got {value}")]
    WeakSecret { field: &'static str, value: usize },
    #[error("rate_limit.{0} must be greater than zero")]
    ZeroRateLimit(&'static str),
    #[error("rate_limit.window_secs must be at most {MAX_WINDOW_SECS}, got {0}")]
    WindowTooLong(u64),
    #[error("{field} entry '{value}' is not an IP address or CIDR range")]
    Network { field: &'static str, value: String },
    #[error("honeypot entry '{0}' must start with '/'")]
    HoneypotPath(String),
    #[error("honeypot entry '{0}' lies under the admin namespace")]
    HoneypotInNamespace(String),
    #[error("audit.channel_capacity must be greater than zero")]
    AuditCapacity,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let namespace = config.gate.namespace.as_str();

    if !namespace.starts_with('/') || namespace.ends_with('/') {
        errors.push(ValidationError::Namespace(namespace.to_string()));
    }
    if HeaderName::from_bytes(config.gate.token_header.as_bytes()).is_err() {
        errors.push(ValidationError::TokenHeader(config.gate.token_header.clone()));
    }
    if config.gate.path_bytes < MIN_SECRET_BYTES {
        errors.push(ValidationError::WeakSecret {
            field: "path_bytes",
            value: config.gate.path_bytes,
        });
    }
    if config.gate.token_bytes < MIN_SECRET_BYTES {
        errors.push(ValidationError::WeakSecret {
            field: "token_bytes",
            value: config.gate.token_bytes,
        });
    }

    if config.rate_limit.limit == 0 {
        errors.push(ValidationError::ZeroRateLimit("limit"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroRateLimit("window_secs"));
    } else if config.rate_limit.window_secs > MAX_WINDOW_SECS {
        errors.push(ValidationError::WindowTooLong(config.rate_limit.window_secs));
    }

    for (field, entries) in [
        ("allowlist.origins", &config.allowlist.origins),
        ("allowlist.trusted_proxies", &config.allowlist.trusted_proxies),
    ] {
        for entry in entries {
            if parse_network(entry).is_err() {
                errors.push(ValidationError::Network {
                    field,
                    value: entry.clone(),
                });
            }
        }
    }

    for entry in config.honeypot.paths.iter().chain(&config.honeypot.prefixes) {
        if !entry.starts_with('/') {
            errors.push(ValidationError::HoneypotPath(entry.clone()));
        } else if is_under(entry, namespace) {
            errors.push(ValidationError::HoneypotInNamespace(entry.clone()));
        }
    }

    if config.audit.channel_capacity == 0 {
        errors.push(ValidationError::AuditCapacity);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_under(path: &str, namespace: &str) -> bool {
    path == namespace
        || path
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('/'))
}
