//! WebSocket adapters for the live push channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        ChangePublisher                              │
//! │   on_commit → derive rooms → Broadcaster::publish per room          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        BroadcastHub                                 │
//! │   try_send a Change message to every handle in the room             │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        RoomRegistry                                 │
//! │   user:o-1           vehicle-requests        conversation:…         │
//! │   ├── handle-a       ├── handle-a            └── handle-d           │
//! │   └── handle-b       └── handle-c                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     ▲
//!                                     │ routes by user room
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        SignalingRelay                               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`rooms`] - Room registry and per-handle outbound channels
//! - [`hub`] - Fan-out of change envelopes
//! - [`signaling`] - Peer negotiation relay
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod handler;
pub mod hub;
pub mod messages;
pub mod rooms;
pub mod signaling;

pub use handler::{authorize_join, websocket_router, ws_handler, ConnectParams, WebSocketState};
pub use hub::BroadcastHub;
pub use messages::{
    ClientMessage, ConnectedMessage, ErrorMessage, PongMessage, RoomAck, ServerMessage,
    SignalMessage,
};
pub use rooms::{HandleId, HandleSender, RoomRegistry};
pub use signaling::{RelayOutcome, SignalingRelay};
