use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;

/// Unix milliseconds.
pub type Ms = i64;

/// Width of one slot on the daily grid.
pub const SLOT_MINUTES: u16 = 30;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// One cell of the shared daily grid, identified by its start label (`HH:MM`).
///
/// Ordered by time of day, so a `BTreeSet<Slot>` is both deduplicated and
/// ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slot(u16);

impl Slot {
    /// Number of slots in one day.
    pub const PER_DAY: u16 = MINUTES_PER_DAY / SLOT_MINUTES;

    pub fn from_minutes(minutes: u16) -> Result<Self, EngineError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(EngineError::Validation(format!(
                "slot minute {minutes} is past the end of the day"
            )));
        }
        if minutes % SLOT_MINUTES != 0 {
            return Err(EngineError::Validation(format!(
                "slot minute {minutes} is not on the {SLOT_MINUTES}-minute grid"
            )));
        }
        Ok(Self(minutes))
    }

    /// Minutes since midnight.
    pub fn minutes(&self) -> u16 {
        self.0
    }

    /// Every slot of the day, ascending.
    pub fn all() -> impl Iterator<Item = Slot> {
        (0..Self::PER_DAY).map(|i| Slot(i * SLOT_MINUTES))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for Slot {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || EngineError::Validation(format!("bad slot label: {s:?} (expected HH:MM)"));
        let (h, m) = s.trim().split_once(':').ok_or_else(bad)?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
            return Err(bad());
        }
        let hours: u16 = h.parse().map_err(|_| bad())?;
        let minutes: u16 = m.parse().map_err(|_| bad())?;
        if hours >= 24 || minutes >= 60 {
            return Err(bad());
        }
        Slot::from_minutes(hours * 60 + minutes)
    }
}

impl TryFrom<String> for Slot {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> Self {
        slot.to_string()
    }
}

/// Scope of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One sub-court.
    SingleUnit,
    /// The entire venue; subsumes every sub-court.
    WholeResource,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::SingleUnit => "single_unit",
            Granularity::WholeResource => "whole_resource",
        }
    }

    /// Whether two reservations of these granularities may not share a slot.
    ///
    /// The venue models exactly one bookable sub-court per slot, so equal
    /// granularities collide just like anything against the whole venue.
    pub fn collides_with(self, other: Granularity) -> bool {
        match (self, other) {
            (Granularity::WholeResource, _) | (_, Granularity::WholeResource) => true,
            (Granularity::SingleUnit, Granularity::SingleUnit) => true,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "singleunit" => Ok(Granularity::SingleUnit),
            "wholeresource" => Ok(Granularity::WholeResource),
            _ => Err(EngineError::Validation(format!("unknown granularity: {s}"))),
        }
    }
}

/// Lifecycle state of a reservation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Approved,
    Declined,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Declined => "declined",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Approved | Status::Declined)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "approved" => Ok(Status::Approved),
            "declined" => Ok(Status::Declined),
            _ => Err(EngineError::InvalidState(format!("unknown status: {s}"))),
        }
    }
}

/// How often the requester intends to use the venue. Carried, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Weekly,
    Biweekly,
    Monthly,
}

/// Requester contact/profile fields. Opaque to conflict and availability logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    /// Free-form extra fields from the submission form.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// One customer's ask for venue time on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub date: NaiveDate,
    pub granularity: Granularity,
    pub slots: BTreeSet<Slot>,
    pub status: Status,
    pub note: Option<String>,
    pub created_at: Ms,
    /// Time of the last status transition.
    pub decided_at: Option<Ms>,
    pub requester: Requester,
}

impl Reservation {
    /// Only approved reservations restrict availability.
    pub fn is_blocking(&self) -> bool {
        self.status == Status::Approved
    }
}

/// A reservation as handed in by the submission layer, before the store
/// assigns identity and status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub date: NaiveDate,
    pub granularity: Granularity,
    pub slots: BTreeSet<Slot>,
    pub requester: Requester,
}

/// All reservations of one calendar date, in creation order.
#[derive(Debug, Clone)]
pub struct DayState {
    pub date: NaiveDate,
    pub reservations: Vec<Reservation>,
}

impl DayState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            reservations: Vec::new(),
        }
    }

    pub fn insert(&mut self, reservation: Reservation) {
        debug_assert_eq!(reservation.date, self.date, "reservation filed under wrong date");
        self.reservations.push(reservation);
    }

    pub fn get(&self, id: &Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    fn get_mut(&mut self, id: &Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == *id)
    }

    pub fn list_by_status(&self, status: Status) -> impl Iterator<Item = &Reservation> {
        self.reservations.iter().filter(move |r| r.status == status)
    }

    pub fn approved(&self) -> impl Iterator<Item = &Reservation> {
        self.list_by_status(Status::Approved)
    }

    /// Set status and note in one step. `None` if the id is unknown, in which
    /// case nothing changed.
    pub fn update_status(
        &mut self,
        id: &Ulid,
        status: Status,
        note: Option<String>,
        at: Ms,
    ) -> Option<&Reservation> {
        let r = self.get_mut(id)?;
        r.status = status;
        r.note = note;
        r.decided_at = Some(at);
        Some(r)
    }

    pub fn amend(
        &mut self,
        id: &Ulid,
        slots: BTreeSet<Slot>,
        granularity: Granularity,
    ) -> Option<&Reservation> {
        let r = self.get_mut(id)?;
        r.slots = slots;
        r.granularity = granularity;
        Some(r)
    }
}

/// Journal events. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RequestSubmitted {
        reservation: Reservation,
    },
    RequestAmended {
        id: Ulid,
        date: NaiveDate,
        slots: BTreeSet<Slot>,
        granularity: Granularity,
    },
    StatusChanged {
        id: Ulid,
        date: NaiveDate,
        status: Status,
        note: Option<String>,
        at: Ms,
    },
}

impl Event {
    pub fn date(&self) -> NaiveDate {
        match self {
            Event::RequestSubmitted { reservation } => reservation.date,
            Event::RequestAmended { date, .. } | Event::StatusChanged { date, .. } => *date,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// Outcome of a conflict check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictResult {
    pub has_conflict: bool,
    pub conflicting_records: Vec<Reservation>,
    pub conflicting_slots: BTreeSet<Slot>,
}

/// One occupied slot held by one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityEntry {
    pub slot: Slot,
    pub granularity: Granularity,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityView {
    pub date: NaiveDate,
    /// Approved entries first, then pending ones.
    pub entries: Vec<AvailabilityEntry>,
    pub approved_count: usize,
    pub pending_count: usize,
}
