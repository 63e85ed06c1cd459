mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod store;
mod workflow;

pub use availability::{availability, free_slots};
pub use conflict::check_conflicts;
pub use error::EngineError;
pub use store::InMemoryStore;
pub use workflow::{check_reopen, check_transition};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, OwnedRwLockWriteGuard, RwLock};
use tracing::info;
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

pub type SharedDayState = Arc<RwLock<DayState>>;

type Responder = oneshot::Sender<io::Result<()>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: Responder,
    },
    Compact {
        events: Vec<Event>,
        response: Responder,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// Blocks for the first append, drains whatever else is already queued,
/// then fsyncs once and answers every sender with the shared result.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_non_append(&mut wal, other);
                continue;
            }
        };
        let mut batch = vec![(event, response)];
        let mut deferred = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                WalCommand::Append { event, response } => batch.push((event, response)),
                other => {
                    // Commit what we have before compaction or counters see the log.
                    deferred = Some(other);
                    break;
                }
            }
        }
        commit_batch(&mut wal, &mut batch);
        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<(Event, Responder)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, Responder)]) -> io::Result<()> {
    let appended = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event));
    // Flush even after a failed append so half-buffered bytes do not leak
    // into the next batch.
    let flushed = wal.flush_sync();
    appended.and(flushed)
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// The reservation engine: per-date state, journaled to a WAL.
///
/// Reads (conflict checks, availability) take the date's read lock. Every
/// mutation holds the date's write lock across validation, WAL append and
/// apply, so approvals for one date are serialized and an approval can never
/// race another approval of an overlapping request.
pub struct Engine {
    pub(super) store: InMemoryStore,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Mutations hold this shared (taken before any day lock); compaction
    /// holds it exclusively so its snapshot cannot miss an in-flight append.
    pub(super) compaction_gate: RwLock<()>,
}

impl Engine {
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let (wal, events) = Wal::recover(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            store: InMemoryStore::new(),
            wal_tx,
            compaction_gate: RwLock::new(()),
        };

        // Sole owner of every lock during replay, so try_write never contends.
        // blocking_write would panic inside an async context.
        for event in &events {
            let day = engine.store.day_or_insert(event.date());
            let mut guard = day
                .try_write()
                .map_err(|_| io::Error::other("replay: day state unexpectedly locked"))?;
            engine.store.apply_event(&mut guard, event);
        }

        info!(
            "replayed {} events: {} reservations across {} dates",
            events.len(),
            engine.store.record_count(),
            engine.store.day_count()
        );
        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// WAL-append then apply. A failed append leaves the day untouched.
    pub(super) async fn persist_and_apply(
        &self,
        day: &mut DayState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.store.apply_event(day, event);
        Ok(())
    }

    /// Lookup id → date, acquire that date's write lock.
    pub(super) async fn resolve_write(
        &self,
        id: &Ulid,
    ) -> Result<OwnedRwLockWriteGuard<DayState>, EngineError> {
        let date = self.store.date_of(id).ok_or(EngineError::NotFound(*id))?;
        let day = self.store.get_day(&date).ok_or(EngineError::NotFound(*id))?;
        Ok(day.write_owned().await)
    }
}
