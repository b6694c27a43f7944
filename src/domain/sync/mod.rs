//! Sync vocabulary shared by the server push path and the client reconciler.

mod envelope;
mod room;

pub use envelope::{ChangeAction, ChangeEnvelope, EntityKind, EntityState, EnvelopeError};
pub use room::Room;
