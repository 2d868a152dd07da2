//! Audit subsystem.
//!
//! # Data Flow
//! ```text
//! AdminAccessGate decision
//!     → record.rs (AuditRecord with masked path and description)
//!     → logger.rs AuditLogger::record (non-blocking)
//!         → broadcast subscribers (alerting collaborators)
//!         → bounded channel → AuditWriter task
//!             → tracing event, target "audit"
//!             → JSON-lines file (optional)
//! ```
//!
//! # Design Decisions
//! - Append-only: records are immutable once built
//! - Sink failures never change an access decision
//! - Secret material is fingerprinted before it reaches a record

pub mod logger;
pub mod record;

pub use logger::{AuditError, AuditLogger, AuditStats, AuditWriter};
pub use record::{AuditRecord, Decision, Fingerprinter};
