//! Covert admin access gate.
//!
//! A hidden operator endpoint behind an origin allowlist, a per-origin
//! fixed-window rate limit, decoy admin paths and a rotating random
//! credential. Every refusal looks like an ordinary 404.

pub mod admin;
pub mod audit;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use admin::{AdminAccessGate, PayloadSource, SecretRotationManager, StatusPayload};
pub use audit::{AuditLogger, AuditRecord, Decision};
pub use config::GateConfig;
pub use http::HttpServer;
pub use lifecycle::{launch, GateHandle, Shutdown};
