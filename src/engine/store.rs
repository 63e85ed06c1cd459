use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::SharedDayState;

/// Per-date reservation state plus an id → date index.
pub struct InMemoryStore {
    days: DashMap<NaiveDate, SharedDayState>,
    id_to_date: DashMap<Ulid, NaiveDate>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            days: DashMap::new(),
            id_to_date: DashMap::new(),
        }
    }

    // ── Days ─────────────────────────────────────────────────

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn get_day(&self, date: &NaiveDate) -> Option<SharedDayState> {
        self.days.get(date).map(|e| e.value().clone())
    }

    /// Fetch the state for `date`, creating an empty one on first use.
    pub fn day_or_insert(&self, date: NaiveDate) -> SharedDayState {
        self.days
            .entry(date)
            .or_insert_with(|| Arc::new(RwLock::new(DayState::new(date))))
            .value()
            .clone()
    }

    /// All known dates, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.days.iter().map(|e| *e.key()).collect();
        dates.sort();
        dates
    }

    // ── Id index ─────────────────────────────────────────────

    pub fn date_of(&self, id: &Ulid) -> Option<NaiveDate> {
        self.id_to_date.get(id).map(|e| *e.value())
    }

    pub fn record_count(&self) -> usize {
        self.id_to_date.len()
    }

    // ── Event application ────────────────────────────────────

    /// Apply an event to the day it belongs to (caller holds the write lock).
    pub fn apply_event(&self, day: &mut DayState, event: &Event) {
        match event {
            Event::RequestSubmitted { reservation } => {
                self.id_to_date.insert(reservation.id, reservation.date);
                day.insert(reservation.clone());
            }
            Event::RequestAmended {
                id,
                slots,
                granularity,
                ..
            } => {
                day.amend(id, slots.clone(), *granularity);
            }
            Event::StatusChanged {
                id,
                status,
                note,
                at,
                ..
            } => {
                day.update_status(id, *status, note.clone(), *at);
            }
        }
    }
}
