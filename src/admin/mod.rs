//! Hidden operator surface.
//!
//! # Data Flow
//! ```text
//! request under namespace or decoy path
//!     → gate.rs (origin, honeypot, rate limit, credential)
//!     → auth.rs (path split, constant-time comparison)
//!     → handlers.rs (payload or rotation, only after admission)
//! ```

pub mod auth;
pub mod credential;
pub mod gate;
pub mod handlers;

pub use auth::AdminAction;
pub use credential::{AdminCredential, CredentialError, SecretRotationManager};
pub use gate::{AccessPolicy, AdminAccessGate, Admission, Denial, GateInitError, GateRequest};
pub use handlers::{OperatorContext, PayloadError, PayloadSource, StatusPayload, SystemStatus};
