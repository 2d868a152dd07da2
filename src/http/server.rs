//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Send admin-surface paths through the gate
//! - Answer everything else, and every denial, with the same 404

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::gate::{AdminAccessGate, GateRequest};
use crate::admin::handlers::{serve_admission, PayloadSource};
use crate::config::GateConfig;
use crate::http::request::{request_id_layer, request_span, strip_client_request_id, X_REQUEST_ID};
use crate::http::response::not_found;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdminAccessGate>,
    pub payload: Arc<dyn PayloadSource>,
}

/// HTTP front for the gate.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &GateConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(request_id_layer())
            .layer(middleware::map_request(strip_client_request_id))
    }

    /// Serve until the shutdown channel fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler.
async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();

    if !state.gate.covers(parts.uri.path()) {
        return not_found();
    }

    let outcome = state.gate.evaluate(&GateRequest {
        peer: parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|c| c.0),
        method: &parts.method,
        path: parts.uri.path(),
        headers: &parts.headers,
        request_id: parts.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok()),
    });

    match outcome {
        Ok(admission) => serve_admission(&state.gate, &state.payload, admission).await,
        Err(_) => not_found(),
    }
}
