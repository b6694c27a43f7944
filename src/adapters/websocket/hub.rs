//! Broadcast hub: fans a change envelope out to every handle in a room.
//!
//! Delivery is at-most-once per handle. Each copy is queued with
//! `try_send`, so a slow or vanished connection never blocks the publisher;
//! its copy is dropped and the client's pull path closes the gap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;

use crate::domain::sync::{ChangeEnvelope, Room};
use crate::ports::{Broadcaster, DeliveryReport};

use super::messages::ServerMessage;
use super::rooms::RoomRegistry;

/// Fan-out service over a [`RoomRegistry`].
///
/// Constructed stopped; call [`BroadcastHub::start`] before serving
/// connections. After [`BroadcastHub::stop`] every handle has been
/// disconnected and publishes are no-ops.
pub struct BroadcastHub {
    registry: Arc<RoomRegistry>,
    running: AtomicBool,
}

impl BroadcastHub {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self {
            registry,
            running: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub fn start(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            tracing::info!("Broadcast hub started");
        }
    }

    /// Stops publishing and disconnects every handle.
    pub async fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            let dropped = self.registry.disconnect_all().await;
            tracing::info!(handles = dropped, "Broadcast hub stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broadcaster for BroadcastHub {
    async fn publish(&self, room: &Room, envelope: ChangeEnvelope) -> DeliveryReport {
        if !self.is_running() {
            tracing::debug!(room = %room, "Hub stopped, publish ignored");
            return DeliveryReport::default();
        }

        let mut report = DeliveryReport::default();
        for handle in self.registry.senders_of(room).await {
            match handle.sender.try_send(ServerMessage::Change(envelope.clone())) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    tracing::debug!(
                        room = %room,
                        handle_id = %handle.id,
                        "Outbound buffer full, envelope dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    report.dropped += 1;
                    tracing::debug!(
                        room = %room,
                        handle_id = %handle.id,
                        "Handle closed, envelope dropped"
                    );
                }
            }
        }

        tracing::trace!(
            room = %room,
            entity_type = %envelope.entity_type,
            entity_id = %envelope.entity_id,
            delivered = report.delivered,
            dropped = report.dropped,
            "Envelope published"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ConversationId, MessageId, Timestamp, UserId};
    use crate::domain::messaging::Message;
    use crate::domain::sync::{ChangeAction, EntityState};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn envelope(room: Room) -> ChangeEnvelope {
        let message = Message::new(
            MessageId::new(7),
            ConversationId::new(),
            user("a"),
            "hello",
            Timestamp::now(),
        )
        .unwrap();
        ChangeEnvelope::new(
            room,
            ChangeAction::Insert,
            &EntityState::Message(message),
            Timestamp::now(),
        )
        .unwrap()
    }

    fn running_hub(capacity: usize) -> BroadcastHub {
        let hub = BroadcastHub::new(Arc::new(RoomRegistry::new(capacity)));
        hub.start();
        hub
    }

    #[tokio::test]
    async fn delivers_to_every_member_of_room() {
        let hub = running_hub(8);
        let (a, mut rx_a) = hub.registry().register(user("a")).await;
        let (b, mut rx_b) = hub.registry().register(user("b")).await;
        hub.registry().subscribe(&Room::VehicleRequests, &a).await;
        hub.registry().subscribe(&Room::VehicleRequests, &b).await;

        let report = hub
            .publish(&Room::VehicleRequests, envelope(Room::VehicleRequests))
            .await;

        assert_eq!(report.delivered, 2);
        assert!(matches!(rx_a.recv().await, Some(ServerMessage::Change(_))));
        assert!(matches!(rx_b.recv().await, Some(ServerMessage::Change(_))));
    }

    #[tokio::test]
    async fn does_not_deliver_to_other_rooms() {
        let hub = running_hub(8);
        let (a, mut rx_a) = hub.registry().register(user("a")).await;
        hub.registry().subscribe(&Room::user(&user("a")), &a).await;

        let report = hub
            .publish(&Room::VehicleRequests, envelope(Room::VehicleRequests))
            .await;

        assert_eq!(report, DeliveryReport::default());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn late_joiner_misses_earlier_publish() {
        let hub = running_hub(8);
        hub.publish(&Room::VehicleRequests, envelope(Room::VehicleRequests))
            .await;

        let (a, mut rx_a) = hub.registry().register(user("a")).await;
        hub.registry().subscribe(&Room::VehicleRequests, &a).await;

        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_buffer_drops_without_blocking() {
        let hub = running_hub(1);
        let (a, _rx_a) = hub.registry().register(user("a")).await;
        hub.registry().subscribe(&Room::VehicleRequests, &a).await;

        let first = hub
            .publish(&Room::VehicleRequests, envelope(Room::VehicleRequests))
            .await;
        let second = hub
            .publish(&Room::VehicleRequests, envelope(Room::VehicleRequests))
            .await;

        assert_eq!(first.delivered, 1);
        assert_eq!(second.dropped, 1);
    }

    #[tokio::test]
    async fn closed_receiver_is_dropped_silently() {
        let hub = running_hub(8);
        let (a, rx_a) = hub.registry().register(user("a")).await;
        hub.registry().subscribe(&Room::VehicleRequests, &a).await;
        drop(rx_a);

        let report = hub
            .publish(&Room::VehicleRequests, envelope(Room::VehicleRequests))
            .await;
        assert_eq!(report.dropped, 1);
    }

    #[tokio::test]
    async fn stop_disconnects_handles_and_silences_publish() {
        let hub = running_hub(8);
        let (a, mut rx_a) = hub.registry().register(user("a")).await;
        hub.registry().subscribe(&Room::VehicleRequests, &a).await;

        hub.stop().await;

        assert!(!hub.is_running());
        assert!(rx_a.recv().await.is_none());
        let report = hub
            .publish(&Room::VehicleRequests, envelope(Room::VehicleRequests))
            .await;
        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test]
    async fn new_hub_is_stopped() {
        let hub = BroadcastHub::new(Arc::new(RoomRegistry::default()));
        assert!(!hub.is_running());
    }
}
