//! In-memory storage adapters.
//!
//! Each store keeps its tables behind one async lock so every conditional
//! write (one active request per vehicle, compare-and-set on status or
//! `updated_at`, find-or-create of a conversation) is a single critical
//! section.

mod conversation_store;
mod notification_store;
mod schedule_store;
mod vehicle_store;

pub use conversation_store::InMemoryConversationStore;
pub use notification_store::InMemoryNotificationStore;
pub use schedule_store::InMemoryScheduleStore;
pub use vehicle_store::InMemoryVehicleStore;
