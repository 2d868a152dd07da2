//! Request identity and tracing spans.
//!
//! Every request gets an `x-request-id` (UUID v4) on the way in. Any id the
//! client sent is discarded first. The id is used for spans and audit records
//! but is not copied onto the response.

use axum::{body::Body, http::Request};
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tracing::Span;

pub const X_REQUEST_ID: &str = "x-request-id";

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Drop a client-supplied id so [`request_id_layer`] always assigns its own.
pub async fn strip_client_request_id(mut request: Request<Body>) -> Request<Body> {
    request.headers_mut().remove(X_REQUEST_ID);
    request
}

/// Read the id assigned by [`request_id_layer`].
pub fn request_id(request: &Request<Body>) -> Option<&str> {
    request.headers().get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
}

/// Span for the HTTP trace layer. Never records the URI, which carries the
/// hidden path.
pub fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        request_id = request_id(request).unwrap_or("-"),
    )
}
