//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (request ID, URI-free span)
//!     → server.rs (catch-all dispatch)
//!     → admin gate (only for namespace and decoy paths)
//!     → response.rs (the shared 404) or operator payload
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{not_found, NOT_FOUND_BODY};
pub use server::{AppState, HttpServer};
