use crate::model::Slot;

/// A request can cover at most every slot of one day.
pub const MAX_SLOTS_PER_REQUEST: usize = Slot::PER_DAY as usize;

/// Reservations (any status) held for a single date.
pub const MAX_RECORDS_PER_DATE: usize = 10_000;

pub const MAX_NOTE_LEN: usize = 2_048;

/// Applies to each requester profile field, including `extra` keys and values.
pub const MAX_REQUESTER_FIELD_LEN: usize = 256;

pub const MAX_REQUESTER_EXTRA_FIELDS: usize = 32;

/// Longest accepted protocol line in bytes.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Rows returned by one privileged listing.
pub const MAX_LIST_ROWS: usize = 50_000;
