use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_booking_conflicts, check_maintenance_conflicts, validate_range};
use super::{ScheduleError, Scheduler, WalCommand};

impl Scheduler {
    /// Validate and commit a booking for `requester`. The whole range is
    /// accepted or rejected atomically; the overlap check and the insert
    /// happen under one write guard.
    pub async fn create_booking(
        &self,
        id: Ulid,
        requester: &Principal,
        range: Interval,
        notes: Option<String>,
    ) -> Result<(), ScheduleError> {
        validate_range(&range)?;
        if let Some(ref n) = notes
            && n.len() > MAX_NOTES_LEN {
                return Err(ScheduleError::LimitExceeded("notes too long"));
            }

        let mut guard = self.schedule.write().await;
        if guard.len() >= MAX_ENTRIES_PER_SCHEDULE {
            return Err(ScheduleError::LimitExceeded("too many schedule entries"));
        }
        if guard.find(id).is_some() {
            return Err(ScheduleError::AlreadyExists(id));
        }

        check_booking_conflicts(&guard, &range)?;

        let event = Event::BookingCreated {
            id,
            owner_id: requester.id,
            range,
            notes,
        };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Validate and commit a maintenance block. Privilege is enforced by
    /// the authorization collaborator at the wire boundary, not here.
    pub async fn schedule_maintenance(
        &self,
        id: Ulid,
        range: Interval,
        description: String,
    ) -> Result<(), ScheduleError> {
        validate_range(&range)?;
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(ScheduleError::LimitExceeded("description too long"));
        }

        let mut guard = self.schedule.write().await;
        if guard.len() >= MAX_ENTRIES_PER_SCHEDULE {
            return Err(ScheduleError::LimitExceeded("too many schedule entries"));
        }
        if guard.find(id).is_some() {
            return Err(ScheduleError::AlreadyExists(id));
        }

        check_maintenance_conflicts(&guard, &range)?;

        let event = Event::MaintenanceScheduled {
            id,
            range,
            description,
        };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Cancel a booking. Only the owner or a privileged requester may
    /// cancel; a second cancel of the same id reports `NotFound`.
    pub async fn cancel_booking(
        &self,
        id: Ulid,
        requester: &Principal,
    ) -> Result<(), ScheduleError> {
        let mut guard = self.schedule.write().await;

        let owner_id = match guard.find(id) {
            Some(ScheduleEntry {
                kind: EntryKind::Booking { owner_id, .. },
                ..
            }) => *owner_id,
            _ => return Err(ScheduleError::NotFound(id)),
        };
        if owner_id != requester.id && !requester.is_privileged() {
            return Err(ScheduleError::Forbidden(
                "only the booking owner or the aircraft owner may cancel",
            ));
        }

        let event = Event::BookingCancelled { id };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Cancel a maintenance block. Owner role only.
    pub async fn cancel_maintenance(
        &self,
        id: Ulid,
        requester: &Principal,
    ) -> Result<(), ScheduleError> {
        if !requester.is_privileged() {
            return Err(ScheduleError::Forbidden("owner role required"));
        }

        let mut guard = self.schedule.write().await;
        match guard.find(id) {
            Some(entry) if entry.is_maintenance() => {}
            _ => return Err(ScheduleError::NotFound(id)),
        }

        let event = Event::MaintenanceCancelled { id };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Compact the WAL by rewriting it with only the events needed to
    /// recreate the current schedule.
    pub async fn compact_wal(&self) -> Result<(), ScheduleError> {
        let guard = self.schedule.read().await;
        let mut events = Vec::with_capacity(guard.len());
        for entry in guard.entries() {
            match &entry.kind {
                EntryKind::Booking { owner_id, notes } => events.push(Event::BookingCreated {
                    id: entry.id,
                    owner_id: *owner_id,
                    range: entry.range,
                    notes: notes.clone(),
                }),
                EntryKind::Maintenance { description } => {
                    events.push(Event::MaintenanceScheduled {
                        id: entry.id,
                        range: entry.range,
                        description: description.clone(),
                    })
                }
            }
        }
        drop(guard);

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| ScheduleError::Storage("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| ScheduleError::Storage("WAL writer dropped response".into()))?
            .map_err(|e| ScheduleError::Storage(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = tokio::sync::oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
