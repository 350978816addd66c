use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Naive local Unix milliseconds — the only time type. No timezone
/// conversion happens anywhere in the core.
pub type Ms = i64;

/// Half-open time range `[start, end)`.
///
/// Validity (`end > start`) is checked by the resolver, not asserted here:
/// an invalid proposal must come back as a rejection, not a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: Ms,
    pub end: Ms,
}

impl Interval {
    pub fn new(start: Ms, end: Ms) -> Self {
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Strict half-open overlap. Touching endpoints (one range ending
    /// exactly when another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }

    /// Clamp to `window`, assuming the two already intersect.
    pub fn clamp_to(&self, window: &Interval) -> Interval {
        Interval::new(self.start.max(window.start), self.end.min(window.end))
    }
}

/// What a schedule entry represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// A user-owned reservation of the aircraft.
    Booking {
        owner_id: Ulid,
        notes: Option<String>,
    },
    /// A blackout window during which no bookings may exist.
    Maintenance { description: String },
}

/// A single committed entry on the aircraft schedule. Bookings and
/// maintenance blocks live in the same overlap universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Ulid,
    pub range: Interval,
    pub kind: EntryKind,
}

impl ScheduleEntry {
    pub fn is_booking(&self) -> bool {
        matches!(self.kind, EntryKind::Booking { .. })
    }

    pub fn is_maintenance(&self) -> bool {
        matches!(self.kind, EntryKind::Maintenance { .. })
    }
}

/// Role attribute supplied by the user directory. `Owner` is the
/// privileged role: it may schedule maintenance and cancel anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Renter,
    Owner,
}

/// Authenticated principal, produced by the directory at the wire
/// boundary. The resolver trusts this and never sees raw session data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Ulid,
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn is_privileged(&self) -> bool {
        self.role == Role::Owner
    }
}

/// WAL record format — flat, one variant per state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        id: Ulid,
        owner_id: Ulid,
        range: Interval,
        notes: Option<String>,
    },
    BookingCancelled {
        id: Ulid,
    },
    MaintenanceScheduled {
        id: Ulid,
        range: Interval,
        description: String,
    },
    MaintenanceCancelled {
        id: Ulid,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRecord {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub start: Ms,
    pub end: Ms,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceRecord {
    pub id: Ulid,
    pub start: Ms,
    pub end: Ms,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_basics() {
        let i = Interval::new(100, 200);
        assert_eq!(i.duration_ms(), 100);
        assert!(i.contains_instant(100));
        assert!(i.contains_instant(199));
        assert!(!i.contains_instant(200)); // half-open
    }

    #[test]
    fn interval_overlap_symmetry() {
        let a = Interval::new(100, 200);
        let b = Interval::new(150, 250);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn interval_back_to_back_does_not_overlap() {
        let a = Interval::new(100, 200);
        let b = Interval::new(200, 300);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn interval_clamp() {
        let i = Interval::new(50, 500);
        let window = Interval::new(100, 300);
        assert_eq!(i.clamp_to(&window), Interval::new(100, 300));
    }

    #[test]
    fn role_privilege() {
        let renter = Principal {
            id: Ulid::new(),
            name: "alice".into(),
            role: Role::Renter,
        };
        let owner = Principal {
            id: Ulid::new(),
            name: "bob".into(),
            role: Role::Owner,
        };
        assert!(!renter.is_privileged());
        assert!(owner.is_privileged());
    }

    #[test]
    fn role_serde_lowercase() {
        let r: Role = serde_json::from_str("\"renter\"").unwrap();
        assert_eq!(r, Role::Renter);
        let o: Role = serde_json::from_str("\"owner\"").unwrap();
        assert_eq!(o, Role::Owner);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::BookingCreated {
            id: Ulid::new(),
            owner_id: Ulid::new(),
            range: Interval::new(1000, 2000),
            notes: Some("checkride".into()),
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
