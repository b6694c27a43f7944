//! Schedule domain module.
//!
//! Patrol shifts with a roster of officers. A shift's status is never
//! stored as truth: it is recomputed from wall-clock time at every read
//! and before every publish.

mod aggregate;
mod roster;
mod status;

pub use aggregate::Schedule;
pub use roster::{Roster, RosterMember, MIN_ROSTER_SIZE};
pub use status::{compute_status, ScheduleStatus, ShiftKind};
