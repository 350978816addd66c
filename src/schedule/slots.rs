//! Interval arithmetic for the read side: turning a committed entry set
//! into the free windows a calendar paints.

use crate::model::*;

use super::store::ScheduleState;

/// Free windows inside `window`: the window minus every committed entry,
/// bookings and maintenance alike.
pub fn free_windows(state: &ScheduleState, window: &Interval) -> Vec<Interval> {
    let mut occupied: Vec<Interval> = state
        .overlapping(window)
        .map(|e| e.range.clamp_to(window))
        .collect();
    occupied.sort_by_key(|i| i.start);
    let occupied = merge_overlapping(&occupied);
    subtract_intervals(&[*window], &occupied)
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Interval]) -> Vec<Interval> {
    let mut merged: Vec<Interval> = Vec::new();
    for &range in sorted {
        if let Some(last) = merged.last_mut()
            && range.start <= last.end {
                last.end = last.end.max(range.end);
                continue;
            }
        merged.push(range);
    }
    merged
}

/// `base` minus `to_remove`. Both inputs sorted by start; `to_remove`
/// disjoint (merge first).
pub fn subtract_intervals(base: &[Interval], to_remove: &[Interval]) -> Vec<Interval> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Interval::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Interval::new(current_start, current_end));
        }
    }

    result
}
