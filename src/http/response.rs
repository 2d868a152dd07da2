//! The one response every refusal shares.
//!
//! Denials, decoy hits and unknown paths all return exactly this, so status
//! and body never tell a caller which check failed or whether a path exists.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

pub const NOT_FOUND_BODY: &str = "Not Found";

pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        NOT_FOUND_BODY,
    )
        .into_response()
}
