//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming admin-surface request:
//!     → origin.rs (resolve caller address, trusted proxies only)
//!     → allowlist.rs (is the origin permitted at all)
//!     → honeypot.rs (is this a decoy path)
//!     → rate_limit.rs (fixed-window budget per origin)
//!     → admin gate compares the credential
//! ```
//!
//! # Design Decisions
//! - Fail closed: an unresolvable origin is never allowed
//! - No trust in client-supplied forwarding headers unless the peer is a
//!   configured proxy
//! - Every check here is side-effect free except the rate limiter's counter

pub mod allowlist;
pub mod honeypot;
pub mod origin;
pub mod rate_limit;

pub use allowlist::{AddressAllowlist, AllowlistError};
pub use honeypot::HoneypotDetector;
pub use origin::OriginResolver;
pub use rate_limit::{RateDecision, RateLimiter};
