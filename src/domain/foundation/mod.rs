//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, errors and the clock abstraction
//! that form the vocabulary of the patrol synchronization domain.

mod clock;
mod command;
mod errors;
mod ids;
mod role;
mod state_machine;
mod timestamp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, TransitionError, ValidationError};
pub use ids::{
    ConversationId, EventId, MessageId, NotificationId, PatrolAreaId, ScheduleId, UserId,
    VehicleId, VehicleRequestId,
};
pub use role::Role;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
