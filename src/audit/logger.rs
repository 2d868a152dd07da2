//! Append-only audit trail.
//!
//! `record` never blocks and never fails: it fans the entry out to in-process
//! subscribers and hands it to a bounded channel drained by [`AuditWriter`].
//! When the channel is full the entry is dropped and counted. The writer emits
//! each entry as a `tracing` event on target `audit` and appends it to the
//! JSON-lines file if one is configured.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, mpsc};

use crate::audit::record::AuditRecord;
use crate::config::AuditConfig;
use crate::observability::metrics;

const SUBSCRIBER_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink write failed: {0}")]
    LoggingFailure(#[from] std::io::Error),
    #[error("audit record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Counters exposed to the operator payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub recorded: u64,
    pub dropped: u64,
}

#[derive(Debug)]
pub struct AuditLogger {
    tx: mpsc::Sender<AuditRecord>,
    events: broadcast::Sender<AuditRecord>,
    recorded: AtomicU64,
    dropped: AtomicU64,
}

impl AuditLogger {
    /// Create the logger and the writer that drains it.
    ///
    /// The writer must be spawned (see [`AuditWriter::run`]) for the file and
    /// tracing sinks to receive anything.
    pub fn new(config: &AuditConfig) -> (Arc<Self>, AuditWriter) {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let (events, _) = broadcast::channel(SUBSCRIBER_CAPACITY);

        let logger = Arc::new(Self {
            tx,
            events,
            recorded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });
        let writer = AuditWriter {
            rx,
            log_path: config.log_path.as_ref().map(PathBuf::from),
            file: None,
        };
        (logger, writer)
    }

    /// Append an entry. Best effort; the caller's response never waits on it.
    pub fn record(&self, entry: AuditRecord) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
        metrics::record_decision(entry.decision());

        // No subscribers is not an error.
        let _ = self.events.send(entry.clone());

        if let Err(e) = self.tx.try_send(entry) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::record_audit_dropped();
            tracing::warn!(reason = %e, "Audit record dropped");
        }
    }

    /// Live stream of audit records for alerting collaborators.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditRecord> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            recorded: self.recorded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Background half of the audit trail.
#[derive(Debug)]
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditRecord>,
    log_path: Option<PathBuf>,
    file: Option<File>,
}

impl AuditWriter {
    /// Drain records until shutdown, then flush whatever is still queued.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                next = self.rx.recv() => match next {
                    Some(record) => self.write(&record).await,
                    None => break,
                },
                _ = shutdown.recv() => {
                    self.rx.close();
                    while let Some(record) = self.rx.recv().await {
                        self.write(&record).await;
                    }
                    break;
                }
            }
        }

        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.sync_all().await {
                tracing::warn!(error = %e, "Audit file sync failed");
            }
        }
        tracing::debug!("Audit writer stopped");
    }

    async fn write(&mut self, record: &AuditRecord) {
        tracing::info!(
            target: "audit",
            decision = %record.decision(),
            origin = ?record.origin(),
            method = %record.method(),
            path = %record.path(),
            request_id = record.request_id().unwrap_or("-"),
            "{}",
            record.description()
        );

        if self.log_path.is_none() {
            return;
        }
        if let Err(e) = self.append(record).await {
            // Reopen on the next record instead of retrying in a loop.
            self.file = None;
            metrics::record_audit_write_failure();
            tracing::warn!(error = %e, "Audit file write failed");
        }
    }

    async fn append(&mut self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        if self.file.is_none() {
            let Some(path) = self.log_path.as_ref() else {
                return Ok(());
            };
            self.file = Some(OpenOptions::new().create(true).append(true).open(path).await?);
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::record::Decision;

    fn record(decision: Decision) -> AuditRecord {
        AuditRecord::new(
            Some("req-1".into()),
            Some("127.0.0.1".parse().unwrap()),
            "GET",
            "/wp-admin",
            decision,
            "test",
        )
    }

    fn temp_log() -> PathBuf {
        std::env::temp_dir().join(format!("covert-gate-audit-{}.jsonl", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn subscribers_see_every_record() {
        let (logger, _writer) = AuditLogger::new(&AuditConfig::default());
        let mut rx = logger.subscribe();

        logger.record(record(Decision::HoneypotTriggered));
        logger.record(record(Decision::Allowed));

        assert_eq!(rx.recv().await.unwrap().decision(), Decision::HoneypotTriggered);
        assert_eq!(rx.recv().await.unwrap().decision(), Decision::Allowed);
    }

    #[tokio::test]
    async fn full_channel_drops_without_blocking() {
        let config = AuditConfig { log_path: None, channel_capacity: 1 };
        let (logger, _writer) = AuditLogger::new(&config);

        for _ in 0..3 {
            logger.record(record(Decision::DeniedOrigin));
        }

        assert_eq!(logger.stats(), AuditStats { recorded: 3, dropped: 2 });
    }

    #[tokio::test]
    async fn writer_appends_json_lines_and_flushes_on_shutdown() {
        let path = temp_log();
        let config = AuditConfig {
            log_path: Some(path.to_string_lossy().into_owned()),
            channel_capacity: 16,
        };
        let (logger, writer) = AuditLogger::new(&config);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        logger.record(record(Decision::DeniedCredential));
        logger.record(record(Decision::HoneypotTriggered));
        let _ = shutdown_tx.send(());
        writer.run(shutdown_rx).await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let decisions: Vec<Decision> = content
            .lines()
            .map(|l| serde_json::from_str::<AuditRecord>(l).unwrap().decision())
            .collect();
        assert_eq!(decisions, vec![Decision::DeniedCredential, Decision::HoneypotTriggered]);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn unwritable_sink_does_not_stop_the_writer() {
        let dir = std::env::temp_dir().join(format!("covert-gate-missing-{}", uuid::Uuid::new_v4()));
        let config = AuditConfig {
            log_path: Some(dir.join("audit.jsonl").to_string_lossy().into_owned()),
            channel_capacity: 16,
        };
        let (logger, writer) = AuditLogger::new(&config);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        logger.record(record(Decision::Allowed));
        let _ = shutdown_tx.send(());
        writer.run(shutdown_rx).await;

        assert_eq!(logger.stats().dropped, 0);
    }
}
