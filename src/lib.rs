//! hangar — reservation scheduler for a shared aircraft, speaking the
//! PostgreSQL wire protocol.
//!
//! One aircraft per database name; bookings and maintenance blackouts live
//! in the same overlap universe and are kept pairwise non-overlapping by
//! the conflict resolver in [`schedule`]. Every committed change is
//! durable in a per-aircraft write-ahead log.

pub mod auth;
pub mod compactor;
pub mod directory;
pub mod feed;
pub mod fleet;
pub mod limits;
pub mod model;
pub mod observability;
pub mod schedule;
pub mod sql;
pub mod tls;
pub mod wal;
pub mod wire;
