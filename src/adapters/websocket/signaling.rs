//! Signaling relay for peer data-channel negotiation.
//!
//! Forwards offer/answer/candidate payloads to every connection of the
//! target user, found through the target's user room. Payloads are never
//! inspected or queued; if the target is not connected the payload is
//! dropped and the sender handles timeout and retry.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::sync::Room;

use super::messages::{ServerMessage, SignalMessage};
use super::rooms::RoomRegistry;

/// Result of one relay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Queued on this many of the target's connections.
    Delivered(usize),
    /// The target has no live connection.
    NoTarget,
}

#[derive(Clone)]
pub struct SignalingRelay {
    registry: Arc<RoomRegistry>,
}

impl SignalingRelay {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Forwards `payload` unchanged from `from` to `target`.
    pub async fn relay(
        &self,
        from: &UserId,
        target: &UserId,
        payload: serde_json::Value,
    ) -> RelayOutcome {
        let handles = self.registry.senders_of(&Room::user(target)).await;
        if handles.is_empty() {
            tracing::debug!(from = %from, target = %target, "Signal target offline, payload dropped");
            return RelayOutcome::NoTarget;
        }

        let message = ServerMessage::Signal(SignalMessage {
            from: from.clone(),
            payload,
        });
        let delivered = handles
            .iter()
            .filter(|h| h.sender.try_send(message.clone()).is_ok())
            .count();

        if delivered == 0 {
            tracing::debug!(target = %target, "Signal target saturated, payload dropped");
            return RelayOutcome::NoTarget;
        }
        RelayOutcome::Delivered(delivered)
    }
}
