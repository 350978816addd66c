//! The overlap predicate and its boundary semantics, defined exactly once
//! and shared by the booking and maintenance commit paths.

use crate::model::*;

use super::store::ScheduleState;
use super::ScheduleError;

pub(crate) fn validate_range(range: &Interval) -> Result<(), ScheduleError> {
    use crate::limits::*;
    if range.end <= range.start {
        return Err(ScheduleError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    if range.start < MIN_VALID_TIMESTAMP_MS || range.end > MAX_VALID_TIMESTAMP_MS {
        return Err(ScheduleError::LimitExceeded("timestamp out of range"));
    }
    if range.duration_ms() > MAX_RANGE_DURATION_MS {
        return Err(ScheduleError::LimitExceeded("range too wide"));
    }
    Ok(())
}

/// A proposed booking must not overlap any committed booking (`SlotTaken`)
/// or maintenance block (`MaintenanceConflict`). Entire range accepted or
/// rejected — there is no partial booking of a non-conflicting sub-range.
pub(crate) fn check_booking_conflicts(
    state: &ScheduleState,
    range: &Interval,
) -> Result<(), ScheduleError> {
    // Bookings first: a slot held by another renter is the more specific
    // rejection when both kinds overlap the proposal.
    for entry in state.overlapping(range) {
        if entry.is_booking() {
            return Err(ScheduleError::SlotTaken(entry.id));
        }
    }
    for entry in state.overlapping(range) {
        if entry.is_maintenance() {
            return Err(ScheduleError::MaintenanceConflict(entry.id));
        }
    }
    Ok(())
}

/// A proposed maintenance block must not overlap any committed booking
/// (existing reservations take precedence; maintenance is scheduled around
/// them) nor any committed block (blocks are kept pairwise disjoint so the
/// non-overlap invariant stays symmetric).
pub(crate) fn check_maintenance_conflicts(
    state: &ScheduleState,
    range: &Interval,
) -> Result<(), ScheduleError> {
    if let Some(entry) = state.overlapping(range).next() {
        return Err(ScheduleError::MaintenanceConflict(entry.id));
    }
    Ok(())
}
