//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Push Ports
//!
//! - `Broadcaster` - Fan-out of change envelopes to rooms
//!
//! ## Storage Ports
//!
//! - `ScheduleRepository` - Patrol shifts with conditional writes
//! - `VehicleRepository` - Vehicles and requests, one active request per vehicle
//! - `ConversationRepository` - Conversations and messages
//! - `NotificationRepository` - Per-user notifications
//!
//! ## Client Ports
//!
//! - `PullSource` - Periodic refetch of an authoritative collection

mod broadcaster;
mod conversation_repository;
mod notification_repository;
mod pull_source;
mod schedule_repository;
mod vehicle_repository;

pub use broadcaster::{Broadcaster, DeliveryReport};
pub use conversation_repository::{ConversationRepository, ResolvedConversation};
pub use notification_repository::{MarkReadScope, NotificationRepository};
pub use pull_source::{PullError, PullSource};
pub use schedule_repository::ScheduleRepository;
pub use vehicle_repository::{VehicleChange, VehicleRepository, VehicleUpdate};
