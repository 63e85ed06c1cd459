use chrono::NaiveDate;

use crate::model::*;

// ── Availability Aggregation ──────────────────────────────────────

/// Build the occupied-slot view of one date.
///
/// Approved and pending records contribute one entry per slot; declined
/// records are never surfaced. Approved entries come first, then pending
/// ones. Within a group, records keep their retrieval order and each
/// record's slots ascend. Pending entries are advisory: they show what might
/// become unavailable, they never block.
pub fn availability(date: NaiveDate, records: &[Reservation]) -> AvailabilityView {
    let mut entries = Vec::new();
    let mut approved_count = 0;
    let mut pending_count = 0;

    for status in [Status::Approved, Status::Pending] {
        for record in records.iter().filter(|r| r.status == status) {
            match status {
                Status::Approved => approved_count += 1,
                Status::Pending => pending_count += 1,
                Status::Declined => {}
            }
            entries.extend(record.slots.iter().map(|&slot| AvailabilityEntry {
                slot,
                granularity: record.granularity,
                status,
            }));
        }
    }

    AvailabilityView {
        date,
        entries,
        approved_count,
        pending_count,
    }
}

/// Slots of the day that no approved or pending record touches.
pub fn free_slots(view: &AvailabilityView) -> Vec<Slot> {
    Slot::all()
        .filter(|slot| !view.entries.iter().any(|e| e.slot == *slot))
        .collect()
}
