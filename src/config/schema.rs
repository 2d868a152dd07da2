//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admin gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Hidden admin surface settings.
    pub gate: SurfaceConfig,

    /// Permitted caller origins and trusted reverse proxies.
    pub allowlist: AllowlistConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Decoy admin paths.
    pub honeypot: HoneypotConfig,

    /// Audit sinks.
    pub audit: AuditConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Hidden admin surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Path prefix reserved for the admin surface (e.g., "/hidden").
    pub namespace: String,

    /// Header carrying the access token.
    pub token_header: String,

    /// Random bytes in the secret path segment.
    pub path_bytes: usize,

    /// Random bytes in the access token.
    pub token_bytes: usize,

    /// Scheduled rotation interval in seconds (0 = only on start and on demand).
    pub rotation_interval_secs: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            namespace: "/hidden".to_string(),
            token_header: "X-Admin-Token".to_string(),
            path_bytes: 16,
            token_bytes: 32,
            rotation_interval_secs: 0,
        }
    }
}

/// Network origins permitted to reach the admin surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AllowlistConfig {
    /// Single addresses or CIDR ranges (e.g., "10.0.0.0/8").
    pub origins: Vec<String>,

    /// Reverse proxies whose X-Forwarded-For header is honoured.
    pub trusted_proxies: Vec<String>,
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            origins: vec!["127.0.0.1".to_string(), "::1".to_string()],
            trusted_proxies: Vec::new(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests permitted per window and origin.
    pub limit: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Bucket count above which expired buckets are pruned.
    pub max_tracked_origins: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            window_secs: 15 * 60,
            max_tracked_origins: 10_000,
        }
    }
}

/// Decoy paths commonly probed by scanners.
///
/// Matching is case-sensitive: `/Admin` is not a decoy unless listed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HoneypotConfig {
    /// Paths matched exactly.
    pub paths: Vec<String>,

    /// Paths matched by prefix.
    pub prefixes: Vec<String>,
}

impl Default for HoneypotConfig {
    fn default() -> Self {
        let paths = [
            "/admin",
            "/admin.php",
            "/administrator",
            "/wp-admin",
            "/wp-login.php",
            "/phpmyadmin",
            "/pma",
            "/cpanel",
            "/login",
            "/backend",
            "/console",
            "/manager/html",
            "/actuator",
            "/.env",
            "/.git/config",
        ];
        let prefixes = [
            "/admin/",
            "/administrator/",
            "/wp-admin/",
            "/phpmyadmin/",
            "/actuator/",
        ];
        Self {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Audit sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Optional JSON-lines file the audit trail is appended to.
    pub log_path: Option<String>,

    /// Records buffered between the request path and the writer task.
    pub channel_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            channel_capacity: 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
