use std::collections::BTreeSet;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::availability;
use super::conflict::check_conflicts;
use super::{Engine, EngineError};

impl Engine {
    /// Check a request against the approved reservations of `date`.
    ///
    /// Always reads the current state; an unknown date yields an empty,
    /// non-conflicting result.
    pub async fn check_conflicts(
        &self,
        date: NaiveDate,
        slots: &BTreeSet<Slot>,
        granularity: Granularity,
        exclude_id: Option<Ulid>,
    ) -> ConflictResult {
        let Some(day) = self.store.get_day(&date) else {
            return ConflictResult::default();
        };
        let guard = day.read().await;
        let result = check_conflicts(&guard.reservations, slots, granularity, exclude_id);
        let outcome = if result.has_conflict { "conflict" } else { "clear" };
        metrics::counter!(crate::observability::CONFLICT_CHECKS_TOTAL, "outcome" => outcome)
            .increment(1);
        result
    }

    /// Occupied slots of `date`, approved first, then advisory pending ones.
    pub async fn get_availability(&self, date: NaiveDate) -> AvailabilityView {
        match self.store.get_day(&date) {
            Some(day) => {
                let guard = day.read().await;
                availability(date, &guard.reservations)
            }
            None => availability(date, &[]),
        }
    }

    pub async fn get_by_id(&self, id: &Ulid) -> Option<Reservation> {
        let date = self.store.date_of(id)?;
        let day = self.store.get_day(&date)?;
        let guard = day.read().await;
        guard.get(id).cloned()
    }

    pub async fn list_approved(&self, date: NaiveDate) -> Vec<Reservation> {
        self.list_by_status(date, Status::Approved).await
    }

    pub async fn list_by_status(&self, date: NaiveDate, status: Status) -> Vec<Reservation> {
        let Some(day) = self.store.get_day(&date) else {
            return Vec::new();
        };
        let guard = day.read().await;
        guard.list_by_status(status).cloned().collect()
    }

    /// Full record listing for privileged callers, ordered by date then
    /// creation. Both filters are optional.
    pub async fn list_reservations(
        &self,
        date: Option<NaiveDate>,
        status: Option<Status>,
    ) -> Result<Vec<Reservation>, EngineError> {
        let dates = match date {
            Some(d) => vec![d],
            None => self.store.dates(),
        };
        let mut out = Vec::new();
        for d in dates {
            let Some(day) = self.store.get_day(&d) else {
                continue;
            };
            let guard = day.read().await;
            for r in &guard.reservations {
                if status.is_some_and(|s| s != r.status) {
                    continue;
                }
                if out.len() >= MAX_LIST_ROWS {
                    return Err(EngineError::LimitExceeded("listing too large; filter by date"));
                }
                out.push(r.clone());
            }
        }
        Ok(out)
    }

    pub fn reservation_count(&self) -> usize {
        self.store.record_count()
    }
}
