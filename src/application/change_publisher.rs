//! ChangePublisher - the write path's bridge to the push channel.
//!
//! Invoked after a write has been committed. Works out which rooms care
//! about the change, re-derives every time- or fact-dependent status so
//! subscribers only ever see fully derived state, and publishes one
//! envelope per room.
//!
//! Publishing is fire-and-forget relative to the write: nothing here
//! returns an error, and a failed or partial publish is only logged.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::foundation::{Clock, CommandMetadata, Timestamp};
use crate::domain::messaging::{Conversation, Message, Notification};
use crate::domain::schedule::Schedule;
use crate::domain::sync::{ChangeAction, ChangeEnvelope, EntityState, Room};
use crate::domain::vehicle::{Vehicle, VehicleRequest};
use crate::ports::{Broadcaster, DeliveryReport};

/// An entity as it stands right after a successful write.
#[derive(Debug, Clone)]
pub enum Committed {
    Schedule(Schedule),
    VehicleRequest(VehicleRequest),
    /// A vehicle together with the fact its status derives from.
    Vehicle {
        vehicle: Vehicle,
        has_active_approved_request: bool,
    },
    Conversation(Conversation),
    Message(Message),
    Notification(Notification),
}

impl Committed {
    /// Applies the status derivations for `now` and returns publishable state.
    pub fn finalize(self, now: Timestamp) -> EntityState {
        match self {
            Committed::Schedule(schedule) => EntityState::Schedule(schedule.with_status_at(now)),
            Committed::VehicleRequest(request) => EntityState::VehicleRequest(request),
            Committed::Vehicle {
                mut vehicle,
                has_active_approved_request,
            } => {
                vehicle.refresh_status(has_active_approved_request);
                EntityState::Vehicle(vehicle)
            }
            Committed::Conversation(conversation) => EntityState::Conversation(conversation),
            Committed::Message(message) => EntityState::Message(message),
            Committed::Notification(notification) => EntityState::Notification(notification),
        }
    }
}

/// Rooms that must hear about a change to `entity`.
///
/// - Schedule: every rostered officer's user room
/// - VehicleRequest: the vehicle-requests feed and the requester's room
/// - Vehicle: the vehicle-requests feed and the assigned officer's room
/// - Message: its conversation room
/// - Conversation: both participants' user rooms
/// - Notification: the recipient's user room
pub fn affected_rooms(entity: &EntityState) -> Vec<Room> {
    let mut rooms = BTreeSet::new();
    match entity {
        EntityState::Schedule(schedule) => {
            rooms.extend(schedule.roster().officer_ids().map(Room::user));
        }
        EntityState::VehicleRequest(request) => {
            rooms.insert(Room::VehicleRequests);
            rooms.insert(Room::user(request.requester()));
        }
        EntityState::Vehicle(vehicle) => {
            rooms.insert(Room::VehicleRequests);
            if let Some(officer) = vehicle.assigned_officer() {
                rooms.insert(Room::user(officer));
            }
        }
        EntityState::Message(message) => {
            rooms.insert(Room::conversation(message.conversation_id()));
        }
        EntityState::Conversation(conversation) => {
            rooms.extend(conversation.participant_ids().map(Room::user));
        }
        EntityState::Notification(notification) => {
            rooms.insert(Room::user(notification.recipient()));
        }
    }
    rooms.into_iter().collect()
}

/// What one `on_commit` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub rooms: usize,
    pub report: DeliveryReport,
}

pub struct ChangePublisher {
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn Clock>,
}

impl ChangePublisher {
    pub fn new(broadcaster: Arc<dyn Broadcaster>, clock: Arc<dyn Clock>) -> Self {
        Self { broadcaster, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Publishes a committed change to every room derived from it.
    pub async fn on_commit(
        &self,
        committed: Committed,
        action: ChangeAction,
        metadata: &CommandMetadata,
    ) -> PublishSummary {
        let now = self.clock.now();
        let entity = committed.finalize(now);
        let rooms = affected_rooms(&entity);
        self.publish(entity, action, rooms, metadata, now).await
    }

    /// Publishes a committed change to an explicit set of rooms.
    ///
    /// Used when the audience differs from the derived one, e.g. officers
    /// just removed from a roster who must drop the shift.
    pub async fn publish_to(
        &self,
        rooms: Vec<Room>,
        committed: Committed,
        action: ChangeAction,
        metadata: &CommandMetadata,
    ) -> PublishSummary {
        let now = self.clock.now();
        let entity = committed.finalize(now);
        self.publish(entity, action, rooms, metadata, now).await
    }

    async fn publish(
        &self,
        entity: EntityState,
        action: ChangeAction,
        rooms: Vec<Room>,
        metadata: &CommandMetadata,
        now: Timestamp,
    ) -> PublishSummary {
        let Some(first) = rooms.first() else {
            return PublishSummary::default();
        };

        let mut envelope = match ChangeEnvelope::new(first.clone(), action, &entity, now) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    entity_type = %entity.kind(),
                    entity_id = %entity.entity_id(),
                    "Failed to build change envelope: {}",
                    e
                );
                return PublishSummary::default();
            }
        };
        if let Some(correlation_id) = metadata.correlation_id() {
            envelope = envelope.with_correlation_id(correlation_id);
        }

        let mut summary = PublishSummary {
            rooms: rooms.len(),
            report: DeliveryReport::default(),
        };
        for room in rooms {
            let report = self
                .broadcaster
                .publish(&room, envelope.for_room(room.clone()))
                .await;
            summary.report = summary.report.merge(report);
        }

        tracing::debug!(
            entity_type = %entity.kind(),
            entity_id = %entity.entity_id(),
            action = ?action,
            rooms = summary.rooms,
            delivered = summary.report.delivered,
            dropped = summary.report.dropped,
            "Change published"
        );
        summary
    }
}
