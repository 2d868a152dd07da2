//! Operations served to an admitted operator.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::admin::auth::AdminAction;
use crate::admin::gate::{AdminAccessGate, Admission};
use crate::audit::AuditStats;
use crate::http::response::not_found;

/// What the payload source gets to know about the admitted request.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorContext {
    pub origin: IpAddr,
    pub request_id: Option<String>,
    pub credential_issued_at: DateTime<Utc>,
    pub tracked_origins: usize,
    pub audit: AuditStats,
}

impl OperatorContext {
    pub fn new(gate: &AdminAccessGate, admission: &Admission) -> Self {
        Self {
            origin: admission.origin,
            request_id: admission.request_id.clone(),
            credential_issued_at: admission.credential.issued_at(),
            tracked_origins: gate.limiter().tracked_origins(),
            audit: gate.audit().stats(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload unavailable: {0}")]
    Unavailable(String),
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Produces the body returned to an operator on a successful access.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    async fn render(&self, ctx: &OperatorContext) -> Result<serde_json::Value, PayloadError>;
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub credential_issued_at: DateTime<Utc>,
    pub tracked_origins: usize,
    pub audit: AuditStats,
}

/// Default payload: service health and gate counters.
#[derive(Debug)]
pub struct StatusPayload {
    started: Instant,
}

impl StatusPayload {
    pub fn new() -> Self {
        Self { started: Instant::now() }
    }
}

impl Default for StatusPayload {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PayloadSource for StatusPayload {
    async fn render(&self, ctx: &OperatorContext) -> Result<serde_json::Value, PayloadError> {
        let status = SystemStatus {
            version: env!("CARGO_PKG_VERSION"),
            status: "operational",
            uptime_secs: self.started.elapsed().as_secs(),
            credential_issued_at: ctx.credential_issued_at,
            tracked_origins: ctx.tracked_origins,
            audit: ctx.audit,
        };
        Ok(serde_json::to_value(status)?)
    }
}

#[derive(Debug, Serialize)]
struct RotationReceipt {
    rotated: bool,
    issued_at: DateTime<Utc>,
}

/// Serve an admitted request. Failures past the gate still look like 404.
pub async fn serve_admission(
    gate: &AdminAccessGate,
    payload: &Arc<dyn PayloadSource>,
    admission: Admission,
) -> Response {
    match admission.action {
        AdminAction::Access => {
            let ctx = OperatorContext::new(gate, &admission);
            match payload.render(&ctx).await {
                Ok(body) => (StatusCode::OK, Json(body)).into_response(),
                Err(e) => {
                    tracing::error!(error = %e, request_id = ?admission.request_id, "Operator payload failed");
                    not_found()
                }
            }
        }
        AdminAction::Rotate => match gate.credentials().rotate() {
            Ok(next) => {
                gate.announce(&next);
                let receipt = RotationReceipt {
                    rotated: true,
                    issued_at: next.issued_at(),
                };
                (StatusCode::OK, Json(receipt)).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "Credential rotation failed; previous credential stays active");
                not_found()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::credential::SecretRotationManager;
    use crate::audit::AuditLogger;
    use crate::config::GateConfig;

    fn gate() -> AdminAccessGate {
        let config = GateConfig::default();
        let (audit, _writer) = AuditLogger::new(&config.audit);
        let credentials = Arc::new(SecretRotationManager::from_config(&config.gate).unwrap());
        AdminAccessGate::new(&config, credentials, audit).unwrap()
    }

    fn admission(gate: &AdminAccessGate, action: AdminAction) -> Admission {
        Admission {
            origin: "127.0.0.1".parse().unwrap(),
            action,
            credential: gate.credentials().current_credential(),
            request_id: Some("req-1".into()),
        }
    }

    struct Failing;

    #[async_trait]
    impl PayloadSource for Failing {
        async fn render(&self, _ctx: &OperatorContext) -> Result<serde_json::Value, PayloadError> {
            Err(PayloadError::Unavailable("backend down".into()))
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn access_renders_status_payload() {
        let gate = gate();
        let payload: Arc<dyn PayloadSource> = Arc::new(StatusPayload::new());
        let response = serve_admission(&gate, &payload, admission(&gate, AdminAction::Access)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "operational");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn rotate_returns_receipt_without_secrets() {
        let gate = gate();
        let before = gate.credentials().current_credential();
        let payload: Arc<dyn PayloadSource> = Arc::new(StatusPayload::new());
        let response = serve_admission(&gate, &payload, admission(&gate, AdminAction::Rotate)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let after = gate.credentials().current_credential();
        assert_eq!(body["rotated"], true);
        assert_ne!(before.secret_path(), after.secret_path());

        let rendered = body.to_string();
        assert!(!rendered.contains(after.secret_path()));
        assert!(!rendered.contains(after.access_token()));
    }

    #[tokio::test]
    async fn payload_failure_is_masked() {
        let gate = gate();
        let payload: Arc<dyn PayloadSource> = Arc::new(Failing);
        let response = serve_admission(&gate, &payload, admission(&gate, AdminAction::Access)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
