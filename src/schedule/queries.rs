use crate::limits::MAX_QUERY_WINDOW_MS;
use crate::model::*;

use super::slots;
use super::{ScheduleError, Scheduler};

fn check_window(window: &Interval) -> Result<(), ScheduleError> {
    if window.end <= window.start {
        return Err(ScheduleError::InvalidRange {
            start: window.start,
            end: window.end,
        });
    }
    if window.duration_ms() > MAX_QUERY_WINDOW_MS {
        return Err(ScheduleError::LimitExceeded("query window too wide"));
    }
    Ok(())
}

impl Scheduler {
    /// Bookings intersecting `window` (all bookings when `None`), sorted
    /// by start. Read-side only — not part of the conflict contract.
    pub async fn list_bookings(
        &self,
        window: Option<Interval>,
    ) -> Result<Vec<BookingRecord>, ScheduleError> {
        if let Some(ref w) = window {
            check_window(w)?;
        }
        let guard = self.schedule.read().await;
        let records = match window {
            Some(w) => collect_bookings(guard.overlapping(&w)),
            None => collect_bookings(guard.entries().iter()),
        };
        Ok(records)
    }

    /// Maintenance blocks intersecting `window` (all when `None`), sorted
    /// by start.
    pub async fn list_maintenance(
        &self,
        window: Option<Interval>,
    ) -> Result<Vec<MaintenanceRecord>, ScheduleError> {
        if let Some(ref w) = window {
            check_window(w)?;
        }
        let guard = self.schedule.read().await;
        let records = match window {
            Some(w) => collect_maintenance(guard.overlapping(&w)),
            None => collect_maintenance(guard.entries().iter()),
        };
        Ok(records)
    }

    /// Free windows inside `window`, optionally dropping any shorter than
    /// `min_duration_ms`. Powers the calendar's availability view.
    pub async fn free_windows(
        &self,
        window: Interval,
        min_duration_ms: Option<Ms>,
    ) -> Result<Vec<Interval>, ScheduleError> {
        check_window(&window)?;
        let guard = self.schedule.read().await;
        let mut free = slots::free_windows(&guard, &window);
        if let Some(min_dur) = min_duration_ms {
            free.retain(|w| w.duration_ms() >= min_dur);
        }
        Ok(free)
    }
}

fn collect_bookings<'a>(entries: impl Iterator<Item = &'a ScheduleEntry>) -> Vec<BookingRecord> {
    entries
        .filter_map(|e| match &e.kind {
            EntryKind::Booking { owner_id, notes } => Some(BookingRecord {
                id: e.id,
                owner_id: *owner_id,
                start: e.range.start,
                end: e.range.end,
                notes: notes.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn collect_maintenance<'a>(
    entries: impl Iterator<Item = &'a ScheduleEntry>,
) -> Vec<MaintenanceRecord> {
    entries
        .filter_map(|e| match &e.kind {
            EntryKind::Maintenance { description } => Some(MaintenanceRecord {
                id: e.id,
                start: e.range.start,
                end: e.range.end,
                description: description.clone(),
            }),
            _ => None,
        })
        .collect()
}
