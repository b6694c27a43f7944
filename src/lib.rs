//! Patrol Sync - live synchronization core for a barangay patrol portal.
//!
//! Keeps patrol schedules, vehicle requests, vehicles, conversations and
//! notifications consistent across every connected client. Committed
//! changes are pushed to room subscribers as change envelopes, and each
//! client reconciles those pushes with periodic pulls of the full
//! collections.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
