//! Hard caps. Every externally supplied quantity is bounded before it can
//! grow a schedule or a WAL without limit.

use crate::model::Ms;

/// Earliest timestamp a schedule accepts (1970-01-01).
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;

/// Latest timestamp a schedule accepts (~year 5000).
pub const MAX_VALID_TIMESTAMP_MS: Ms = 95_617_584_000_000;

/// Widest single booking or maintenance block: 90 days.
pub const MAX_RANGE_DURATION_MS: Ms = 90 * 24 * 3_600_000;

/// Widest read-side query window: 366 days.
pub const MAX_QUERY_WINDOW_MS: Ms = 366 * 24 * 3_600_000;

/// Entries (bookings + maintenance) per aircraft schedule.
pub const MAX_ENTRIES_PER_SCHEDULE: usize = 100_000;

/// Free-text limits.
pub const MAX_NOTES_LEN: usize = 1_024;
pub const MAX_DESCRIPTION_LEN: usize = 1_024;

/// Aircraft (tail numbers) a single server will manage.
pub const MAX_AIRCRAFT: usize = 4_096;

/// Tail number length, pre-sanitization.
pub const MAX_TAIL_NUMBER_LEN: usize = 64;
