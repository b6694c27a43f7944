//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the sync core to the outside world:
//! - `memory` - In-memory repositories with conditional writes
//! - `websocket` - Room registry, broadcast hub and signaling relay
//! - `http` - REST pull/mutation surface and the reqwest pull client

pub mod http;
pub mod memory;
pub mod websocket;
