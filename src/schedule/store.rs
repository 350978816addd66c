use ulid::Ulid;

use crate::model::*;

/// Authoritative in-memory entry set for one aircraft. The single source
/// of truth for overlap queries — no duplicate index is kept.
///
/// Entries stay sorted by `range.start` so overlap and window queries can
/// binary-search the right edge instead of scanning everything.
#[derive(Debug, Clone, Default)]
pub struct ScheduleState {
    entries: Vec<ScheduleEntry>,
}

impl ScheduleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn find(&self, id: Ulid) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Insert maintaining sort order by range.start.
    pub fn insert(&mut self, entry: ScheduleEntry) {
        let pos = self
            .entries
            .binary_search_by_key(&entry.range.start, |e| e.range.start)
            .unwrap_or_else(|e| e);
        self.entries.insert(pos, entry);
    }

    pub fn remove(&mut self, id: Ulid) -> Option<ScheduleEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Every entry whose range satisfies the strict half-open overlap test
    /// `entry.start < query.end && entry.end > query.start`. Entries at
    /// index >= the partition point start at or after `query.end` and
    /// cannot overlap.
    pub fn overlapping(&self, query: &Interval) -> impl Iterator<Item = &ScheduleEntry> {
        let right_bound = self
            .entries
            .partition_point(|e| e.range.start < query.end);
        self.entries[..right_bound]
            .iter()
            .filter(move |e| e.range.end > query.start)
    }

    /// Apply a WAL event. Replay and live mutation go through the same
    /// path so recovered state cannot drift from committed state.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::BookingCreated {
                id,
                owner_id,
                range,
                notes,
            } => {
                self.insert(ScheduleEntry {
                    id: *id,
                    range: *range,
                    kind: EntryKind::Booking {
                        owner_id: *owner_id,
                        notes: notes.clone(),
                    },
                });
            }
            Event::BookingCancelled { id } => {
                self.remove(*id);
            }
            Event::MaintenanceScheduled {
                id,
                range,
                description,
            } => {
                self.insert(ScheduleEntry {
                    id: *id,
                    range: *range,
                    kind: EntryKind::Maintenance {
                        description: description.clone(),
                    },
                });
            }
            Event::MaintenanceCancelled { id } => {
                self.remove(*id);
            }
        }
    }
}
