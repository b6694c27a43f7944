//! Application layer - Commands, Queries, and the Change Publisher.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers (write) commit through conditional repository writes and
//! then publish; [`SyncQueries`] (read) serves the pull endpoints with
//! derived statuses recomputed at read time.

pub mod change_publisher;
pub mod handlers;
pub mod queries;

#[cfg(test)]
pub(crate) mod test_support;

pub use change_publisher::{affected_rooms, ChangePublisher, Committed, PublishSummary};
pub use handlers::*;
pub use queries::{RequestFilter, SyncQueries};
