//! Reduction of a calendar-grid selection to the one canonical interval
//! that gets checked and persisted.
//!
//! The calendar presents a week as (day, hour) cells. A drag selects a
//! contiguous run of cells, possibly crossing day columns. The committed
//! reservation is the continuous envelope from the first selected hour to
//! the end of the last selected hour: a multi-day selection occupies every
//! hour in between, overnight hours on intermediate days included. A
//! reservation is never a set of disjoint sub-intervals.

use crate::model::{Interval, Ms};

use super::ScheduleError;

pub const HOUR_MS: Ms = 3_600_000;
pub const DAY_MS: Ms = 24 * HOUR_MS;

/// One cell of the calendar grid: hour `hour` (0-23, covering
/// `[hour, hour+1)`) on day `day` of the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cell {
    pub day: u16,
    pub hour: u8,
}

impl Cell {
    pub fn new(day: u16, hour: u8) -> Self {
        Self { day, hour }
    }
}

/// Reduce a selected run of cells to its canonical interval, relative to
/// `grid_start` (midnight of day 0 of the visible grid, naive local ms).
///
/// `[first day at first hour, last day at last hour + 1)`. Cell order in
/// the input does not matter.
pub fn reduce_selection(grid_start: Ms, cells: &[Cell]) -> Result<Interval, ScheduleError> {
    if cells.is_empty() {
        return Err(ScheduleError::InvalidRange { start: 0, end: 0 });
    }
    if cells.iter().any(|c| c.hour > 23) {
        return Err(ScheduleError::LimitExceeded("hour index out of range"));
    }

    let first = cells.iter().min().unwrap();
    let last = cells.iter().max().unwrap();

    let start = grid_start + Ms::from(first.day) * DAY_MS + Ms::from(first.hour) * HOUR_MS;
    let end = grid_start + Ms::from(last.day) * DAY_MS + Ms::from(last.hour + 1) * HOUR_MS;

    Ok(Interval::new(start, end))
}
