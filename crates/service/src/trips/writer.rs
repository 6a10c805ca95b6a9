//! Background persistence writer.
//!
//! A single tokio task owns every write of the trips blob. Callers queue a
//! serialized snapshot and move on; the task coalesces queued snapshots,
//! writes only the newest, and answers flush requests once everything queued
//! before them is on the backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::errors::ServiceError;
use crate::storage::kv::KvBackend;

enum PersistCommand {
    Save { seq: u64, payload: String },
    Flush { reply: oneshot::Sender<Result<(), ServiceError>> },
}

/// Handle to the writer task. Dropping the last handle lets the task write
/// whatever is still queued and exit.
pub struct PersistWriter {
    tx: mpsc::UnboundedSender<PersistCommand>,
    seq: AtomicU64,
}

impl PersistWriter {
    /// Spawn the writer task on the current tokio runtime.
    pub fn spawn<B>(backend: Arc<B>, key: impl Into<String>, debounce: Duration) -> Self
    where
        B: KvBackend + ?Sized + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(backend, key.into(), debounce, rx));
        Self { tx, seq: AtomicU64::new(0) }
    }

    /// Queue a snapshot for writing. Never waits for the write.
    ///
    /// Callers must queue snapshots in the order they were taken.
    pub fn save(&self, payload: String) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(PersistCommand::Save { seq, payload }).is_err() {
            error!(seq, "persistence writer is gone; snapshot dropped");
        }
        seq
    }

    /// Wait until every snapshot queued so far has been written.
    /// Returns the outcome of the most recent write.
    pub async fn flush(&self) -> Result<(), ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PersistCommand::Flush { reply })
            .map_err(|_| ServiceError::Storage("persistence writer stopped".into()))?;
        rx.await
            .map_err(|_| ServiceError::Storage("persistence writer stopped".into()))?
    }
}

async fn run<B>(backend: Arc<B>, key: String, debounce: Duration, mut rx: mpsc::UnboundedReceiver<PersistCommand>)
where
    B: KvBackend + ?Sized,
{
    let mut last: Result<(), ServiceError> = Ok(());

    while let Some(cmd) = rx.recv().await {
        let (mut seq, mut payload) = match cmd {
            PersistCommand::Flush { reply } => {
                let _ = reply.send(last.clone());
                continue;
            }
            PersistCommand::Save { seq, payload } => (seq, payload),
        };

        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
        }

        // Take newer snapshots that are already queued. Stop at a flush so it
        // is answered right after the write it was waiting for.
        let mut skipped = 0usize;
        let mut waiting = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                PersistCommand::Save { seq: s, payload: p } => {
                    seq = s;
                    payload = p;
                    skipped += 1;
                }
                PersistCommand::Flush { reply } => {
                    waiting = Some(reply);
                    break;
                }
            }
        }
        if skipped > 0 {
            debug!(seq, skipped, "coalesced queued snapshots");
        }

        last = match backend.set(&key, payload).await {
            Ok(()) => {
                debug!(%key, seq, "trips persisted");
                Ok(())
            }
            Err(e) => {
                error!(%key, seq, error = %e, "failed to persist trips; in-memory state kept");
                Err(e)
            }
        };

        if let Some(reply) = waiting {
            let _ = reply.send(last.clone());
        }
    }

    if let Err(e) = &last {
        warn!(%key, error = %e, "persistence writer exiting after a failed write");
    }
}
