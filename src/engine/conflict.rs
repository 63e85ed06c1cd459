use std::collections::BTreeSet;

use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

pub(crate) fn validate_slots(slots: &BTreeSet<Slot>) -> Result<(), EngineError> {
    if slots.is_empty() {
        return Err(EngineError::Validation("at least one slot is required".into()));
    }
    if slots.len() > MAX_SLOTS_PER_REQUEST {
        return Err(EngineError::LimitExceeded("too many slots in request"));
    }
    Ok(())
}

pub(crate) fn validate_note(note: &Option<String>) -> Result<(), EngineError> {
    if let Some(n) = note
        && n.len() > MAX_NOTE_LEN
    {
        return Err(EngineError::LimitExceeded("note too long"));
    }
    Ok(())
}

pub(crate) fn validate_requester(requester: &Requester) -> Result<(), EngineError> {
    let too_long = |s: &str| s.len() > MAX_REQUESTER_FIELD_LEN;
    let optional = [&requester.email, &requester.phone, &requester.organization];
    if too_long(&requester.name) || optional.iter().any(|f| f.as_deref().is_some_and(too_long)) {
        return Err(EngineError::LimitExceeded("requester field too long"));
    }
    if requester.extra.len() > MAX_REQUESTER_EXTRA_FIELDS {
        return Err(EngineError::LimitExceeded("too many requester fields"));
    }
    if requester.extra.iter().any(|(k, v)| too_long(k) || too_long(v)) {
        return Err(EngineError::LimitExceeded("requester field too long"));
    }
    Ok(())
}

/// Check a request against the approved records of one date.
///
/// Records in any other status are skipped, as is `exclude` (the record being
/// edited). A record conflicts when its slots overlap the request and the
/// granularities collide; the overlapping slots of every conflicting record are
/// unioned into `conflicting_slots`. An empty request never conflicts.
pub fn check_conflicts<'a>(
    records: impl IntoIterator<Item = &'a Reservation>,
    slots: &BTreeSet<Slot>,
    granularity: Granularity,
    exclude: Option<Ulid>,
) -> ConflictResult {
    let mut result = ConflictResult::default();
    if slots.is_empty() {
        return result;
    }

    for candidate in records {
        if !candidate.is_blocking() || exclude == Some(candidate.id) {
            continue;
        }
        let mut overlap = candidate.slots.intersection(slots).peekable();
        if overlap.peek().is_none() {
            continue;
        }
        if !candidate.granularity.collides_with(granularity) {
            continue;
        }
        result.conflicting_slots.extend(overlap.copied());
        result.conflicting_records.push(candidate.clone());
    }

    result.has_conflict = !result.conflicting_records.is_empty();
    result
}

/// Fail with `Conflict` unless the request is clear of approved records.
pub(crate) fn check_no_conflict(
    day: &DayState,
    slots: &BTreeSet<Slot>,
    granularity: Granularity,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    let result = check_conflicts(&day.reservations, slots, granularity, exclude);
    if result.has_conflict {
        return Err(EngineError::Conflict {
            slots: result.conflicting_slots,
        });
    }
    Ok(())
}
