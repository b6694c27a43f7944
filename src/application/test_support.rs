//! Shared test doubles for application handlers.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::adapters::memory::{
    InMemoryConversationStore, InMemoryNotificationStore, InMemoryScheduleStore,
    InMemoryVehicleStore,
};
use crate::domain::foundation::{ManualClock, Timestamp};
use crate::domain::sync::{ChangeEnvelope, EntityKind, Room};
use crate::ports::{Broadcaster, DeliveryReport};

use super::change_publisher::ChangePublisher;
use super::handlers::Notifier;
use super::queries::SyncQueries;

/// Broadcaster that records every publish.
pub struct RecordingBroadcaster {
    published: Mutex<Vec<(Room, ChangeEnvelope)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<(Room, ChangeEnvelope)> {
        self.published.lock().unwrap().clone()
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.published().into_iter().map(|(room, _)| room).collect()
    }

    pub fn of_kind(&self, kind: EntityKind) -> Vec<(Room, ChangeEnvelope)> {
        self.published()
            .into_iter()
            .filter(|(_, e)| e.entity_type == kind)
            .collect()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn publish(&self, room: &Room, envelope: ChangeEnvelope) -> DeliveryReport {
        self.published.lock().unwrap().push((room.clone(), envelope));
        DeliveryReport {
            delivered: 1,
            dropped: 0,
        }
    }
}

/// Everything a handler test needs, wired to in-memory adapters.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub publisher: Arc<ChangePublisher>,
    pub schedules: Arc<InMemoryScheduleStore>,
    pub vehicles: Arc<InMemoryVehicleStore>,
    pub conversations: Arc<InMemoryConversationStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub notifier: Arc<Notifier>,
}

impl Harness {
    pub fn at(secs: i64) -> Self {
        let clock = Arc::new(ManualClock::new(Timestamp::from_unix_secs(secs)));
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let publisher = Arc::new(ChangePublisher::new(broadcaster.clone(), clock.clone()));
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let notifier = Arc::new(Notifier::new(notifications.clone(), publisher.clone()));
        Self {
            clock,
            broadcaster,
            publisher,
            schedules: Arc::new(InMemoryScheduleStore::new()),
            vehicles: Arc::new(InMemoryVehicleStore::new()),
            conversations: Arc::new(InMemoryConversationStore::new()),
            notifications,
            notifier,
        }
    }

    pub fn queries(&self) -> SyncQueries {
        SyncQueries::new(
            self.schedules.clone(),
            self.vehicles.clone(),
            self.conversations.clone(),
            self.notifications.clone(),
            self.clock.clone(),
        )
    }
}
