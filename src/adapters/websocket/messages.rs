//! WebSocket message types for the push channel.
//!
//! Defines the protocol between server and connected clients:
//! - Client → Server: join/leave a room, relay a signal, ping
//! - Server → Client: connection status, change envelopes, relayed
//!   signals, join acknowledgements, errors, pongs

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::sync::{ChangeEnvelope, Room};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established; the user room is already joined.
    Connected(ConnectedMessage),

    /// Full-state change of one entity in a joined room.
    Change(ChangeEnvelope),

    /// Connection-negotiation payload relayed from another user.
    Signal(SignalMessage),

    /// Room join acknowledged.
    Joined(RoomAck),

    /// Room leave acknowledged.
    Left(RoomAck),

    /// Error occurred.
    Error(ErrorMessage),

    /// Heartbeat response.
    Pong(PongMessage),
}

/// Sent once after the upgrade completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub handle_id: String,
    pub user_id: UserId,
    pub rooms: Vec<Room>,
    pub timestamp: String,
}

/// A relayed offer, answer or candidate. The payload is opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMessage {
    pub from: UserId,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomAck {
    pub room: Room,
}

/// Error message sent to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.into(),
            message: message.into(),
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }
}

impl From<DomainError> for ServerMessage {
    fn from(err: DomainError) -> Self {
        ServerMessage::error(err.code.to_string(), err.message)
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe this connection to a room.
    Join { room: Room },

    /// Unsubscribe this connection from a room.
    Leave { room: Room },

    /// Forward a negotiation payload to every connection of `target`.
    Signal {
        target: UserId,
        payload: serde_json::Value,
    },

    /// Heartbeat request.
    Ping,
}
