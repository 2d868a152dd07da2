//! Startup orchestration.
//!
//! Subsystems come up in dependency order: credential (fails fast if the
//! CSPRNG is unavailable), audit trail, gate, then background tasks, and the
//! HTTP server last so no traffic arrives before the gate is ready.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::admin::credential::{CredentialError, SecretRotationManager};
use crate::admin::gate::{AdminAccessGate, GateInitError};
use crate::admin::handlers::PayloadSource;
use crate::audit::AuditLogger;
use crate::config::GateConfig;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("credential generation failed: {0}")]
    Credential(#[from] CredentialError),
    #[error("gate initialisation failed: {0}")]
    Gate(#[from] GateInitError),
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running gate.
pub struct GateHandle {
    local_addr: SocketAddr,
    gate: Arc<AdminAccessGate>,
    shutdown: Shutdown,
    audit_shutdown: Shutdown,
    server: JoinHandle<Result<(), std::io::Error>>,
    audit_writer: JoinHandle<()>,
    rotation: Option<JoinHandle<()>>,
}

impl GateHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn gate(&self) -> &Arc<AdminAccessGate> {
        &self.gate
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Stop accepting, drain in-flight requests, then flush the audit trail.
    ///
    /// The audit writer has its own signal, fired only once the server has
    /// finished, so records from draining requests still reach every sink.
    pub async fn stop(self) -> Result<(), std::io::Error> {
        self.shutdown.trigger();

        let served = match self.server.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "HTTP server task failed");
                Ok(())
            }
        };
        if let Some(rotation) = self.rotation {
            let _ = rotation.await;
        }

        self.audit_shutdown.trigger();
        if let Err(e) = self.audit_writer.await {
            tracing::error!(error = %e, "Audit writer task failed");
        }

        tracing::info!("Gate stopped");
        served
    }
}

/// Bring the gate up on an already-bound listener.
pub async fn launch(
    config: GateConfig,
    listener: TcpListener,
    payload: Arc<dyn PayloadSource>,
) -> Result<GateHandle, StartupError> {
    let credentials = Arc::new(SecretRotationManager::from_config(&config.gate)?);
    let (audit, writer) = AuditLogger::new(&config.audit);
    let gate = Arc::new(AdminAccessGate::new(&config, credentials, audit)?);
    let shutdown = Shutdown::new();
    let audit_shutdown = Shutdown::new();

    gate.announce(&gate.credentials().current_credential());

    let audit_writer = tokio::spawn(writer.run(audit_shutdown.subscribe()));

    let rotation = match config.gate.rotation_interval_secs {
        0 => None,
        secs => Some(tokio::spawn(rotate_on_schedule(
            gate.clone(),
            Duration::from_secs(secs),
            shutdown.subscribe(),
        ))),
    };

    let local_addr = listener.local_addr()?;
    let server = HttpServer::new(
        &config,
        AppState {
            gate: gate.clone(),
            payload,
        },
    );
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tracing::info!(
        address = %local_addr,
        namespace = %gate.namespace(),
        rate_limit = gate.limiter().limit(),
        window_secs = gate.limiter().window().as_secs(),
        "Gate listening"
    );

    Ok(GateHandle {
        local_addr,
        gate,
        shutdown,
        audit_shutdown,
        server,
        audit_writer,
        rotation,
    })
}

async fn rotate_on_schedule(gate: Arc<AdminAccessGate>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(every);
    // The first tick fires immediately; the startup credential covers it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => match gate.credentials().rotate() {
                Ok(next) => gate.announce(&next),
                Err(e) => tracing::error!(error = %e, "Scheduled rotation failed; previous credential stays active"),
            },
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Rotation schedule stopped");
}
