use ulid::Ulid;

#[derive(Debug)]
pub enum ScheduleError {
    /// End not strictly after start. Rejected before any store access.
    InvalidRange { start: i64, end: i64 },
    /// Proposed booking overlaps an existing booking.
    SlotTaken(Ulid),
    /// Proposed range overlaps a maintenance block, or a proposed
    /// maintenance block overlaps an existing booking or block.
    MaintenanceConflict(Ulid),
    /// Requester lacks ownership/privilege for the operation.
    Forbidden(&'static str),
    NotFound(Ulid),
    AlreadyExists(Ulid),
    LimitExceeded(&'static str),
    /// Underlying log unavailable or write failed. Surfaced, never retried
    /// by the core.
    Storage(String),
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::InvalidRange { start, end } => {
                write!(f, "invalid range: end {end} must be after start {start}")
            }
            ScheduleError::SlotTaken(id) => write!(f, "slot taken by booking {id}"),
            ScheduleError::MaintenanceConflict(id) => {
                write!(f, "conflicts with schedule entry {id}")
            }
            ScheduleError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            ScheduleError::NotFound(id) => write!(f, "not found: {id}"),
            ScheduleError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            ScheduleError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            ScheduleError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for ScheduleError {}
