//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, timestamps, clock, errors)
//! - `schedule` - Patrol shifts, rosters and time-derived status
//! - `vehicle` - Vehicles, usage requests and their state machines
//! - `messaging` - Conversations, messages and notifications
//! - `sync` - Rooms and change envelopes for the push channel

pub mod foundation;
pub mod messaging;
pub mod schedule;
pub mod sync;
pub mod vehicle;
