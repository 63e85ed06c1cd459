use std::collections::BTreeSet;

use tokio::sync::oneshot;
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{
    check_no_conflict, now_ms, validate_note, validate_requester, validate_slots,
};
use super::workflow::{check_reopen, check_transition};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    /// Admit a new request as `Pending`.
    ///
    /// Refused with `Conflict` when an approved reservation already holds an
    /// overlapping slot. Pending and declined records never block a
    /// submission.
    pub async fn submit(&self, candidate: Candidate) -> Result<Reservation, EngineError> {
        validate_slots(&candidate.slots)?;
        validate_requester(&candidate.requester)?;

        let _gate = self.compaction_gate.read().await;
        let day = self.store.day_or_insert(candidate.date);
        let mut guard = day.write().await;
        if guard.reservations.len() >= MAX_RECORDS_PER_DATE {
            return Err(EngineError::LimitExceeded("too many reservations on date"));
        }

        if let Err(e) = check_no_conflict(&guard, &candidate.slots, candidate.granularity, None) {
            debug!("refused submission for {}: {e}", candidate.date);
            return Err(e);
        }

        let reservation = Reservation {
            id: Ulid::new(),
            date: candidate.date,
            granularity: candidate.granularity,
            slots: candidate.slots,
            status: Status::Pending,
            note: None,
            created_at: now_ms(),
            decided_at: None,
            requester: candidate.requester,
        };
        let event = Event::RequestSubmitted {
            reservation: reservation.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        info!(
            "request {} submitted for {} ({}, {} slots)",
            reservation.id,
            reservation.date,
            reservation.granularity,
            reservation.slots.len()
        );
        Ok(reservation)
    }

    /// Change the slots or granularity of a request still awaiting a decision.
    /// The request's own current slots never count against it.
    pub async fn amend(
        &self,
        id: Ulid,
        slots: BTreeSet<Slot>,
        granularity: Granularity,
    ) -> Result<Reservation, EngineError> {
        validate_slots(&slots)?;
        let _gate = self.compaction_gate.read().await;
        let mut guard = self.resolve_write(&id).await?;
        let current = guard.get(&id).ok_or(EngineError::NotFound(id))?;
        if current.status != Status::Pending {
            return Err(EngineError::InvalidState(format!(
                "only pending requests can be amended; {id} is {}",
                current.status
            )));
        }

        check_no_conflict(&guard, &slots, granularity, Some(id))?;

        let event = Event::RequestAmended {
            id,
            date: guard.date,
            slots,
            granularity,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        guard.get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Record a decision on a pending request.
    ///
    /// Approval re-checks the approved records of the date while holding the
    /// date's write lock, so two overlapping requests can never both be
    /// approved. Nothing changes when any check fails.
    pub async fn transition(
        &self,
        id: Ulid,
        target: Status,
        note: Option<String>,
    ) -> Result<Reservation, EngineError> {
        validate_note(&note)?;
        let _gate = self.compaction_gate.read().await;
        let mut guard = self.resolve_write(&id).await?;
        let current = guard.get(&id).ok_or(EngineError::NotFound(id))?;
        check_transition(current.status, target)?;

        if target == Status::Approved {
            let (slots, granularity) = (current.slots.clone(), current.granularity);
            if let Err(e) = check_no_conflict(&guard, &slots, granularity, Some(id)) {
                debug!("refused approval of {id}: {e}");
                return Err(e);
            }
        }

        let event = Event::StatusChanged {
            id,
            date: guard.date,
            status: target,
            note,
            at: now_ms(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        metrics::counter!(crate::observability::TRANSITIONS_TOTAL, "status" => target.as_str())
            .increment(1);
        info!("request {id} on {} is now {target}", guard.date);
        guard.get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    pub async fn approve(&self, id: Ulid, note: Option<String>) -> Result<Reservation, EngineError> {
        self.transition(id, Status::Approved, note).await
    }

    pub async fn decline(&self, id: Ulid, note: Option<String>) -> Result<Reservation, EngineError> {
        self.transition(id, Status::Declined, note).await
    }

    /// Administrative override: put a decided request back to `Pending`.
    /// A reopened approval stops blocking immediately. Without a new note the
    /// note of the earlier decision is kept.
    pub async fn reopen(&self, id: Ulid, note: Option<String>) -> Result<Reservation, EngineError> {
        validate_note(&note)?;
        let _gate = self.compaction_gate.read().await;
        let mut guard = self.resolve_write(&id).await?;
        let current = guard.get(&id).ok_or(EngineError::NotFound(id))?;
        check_reopen(current.status)?;
        let note = note.or_else(|| current.note.clone());

        let event = Event::StatusChanged {
            id,
            date: guard.date,
            status: Status::Pending,
            note,
            at: now_ms(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        metrics::counter!(crate::observability::TRANSITIONS_TOTAL, "status" => "reopened")
            .increment(1);
        info!("request {id} on {} reopened", guard.date);
        guard.get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Compact the WAL by rewriting it with one submission per live record,
    /// each carrying the record's current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.write().await;
        let mut events = Vec::with_capacity(self.store.record_count());
        for date in self.store.dates() {
            let Some(day) = self.store.get_day(&date) else {
                continue;
            };
            let guard = day.read().await;
            events.extend(guard.reservations.iter().map(|r| Event::RequestSubmitted {
                reservation: r.clone(),
            }));
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
