//! Read side of the pull endpoints.
//!
//! Every list returns the full current collection. Derived statuses are
//! recomputed here, at the point of read, so a row that has not been
//! written since its shift started still comes back Ongoing.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Clock, ConversationId, DomainError, ErrorCode, UserId, VehicleId};
use crate::domain::messaging::{Conversation, Message, Notification};
use crate::domain::schedule::Schedule;
use crate::domain::vehicle::{Vehicle, VehicleRequest};
use crate::ports::{
    ConversationRepository, NotificationRepository, ScheduleRepository, VehicleRepository,
};

/// Which vehicle requests a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestFilter {
    #[default]
    Mine,
    All,
}

/// Query facade over every repository the reconciler pulls from.
#[derive(Clone)]
pub struct SyncQueries {
    schedules: Arc<dyn ScheduleRepository>,
    vehicles: Arc<dyn VehicleRepository>,
    conversations: Arc<dyn ConversationRepository>,
    notifications: Arc<dyn NotificationRepository>,
    clock: Arc<dyn Clock>,
}

impl SyncQueries {
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        vehicles: Arc<dyn VehicleRepository>,
        conversations: Arc<dyn ConversationRepository>,
        notifications: Arc<dyn NotificationRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schedules,
            vehicles,
            conversations,
            notifications,
            clock,
        }
    }

    /// All shifts, or only those `officer` is rostered on.
    pub async fn list_schedules(
        &self,
        officer: Option<&UserId>,
    ) -> Result<Vec<Schedule>, DomainError> {
        let schedules = match officer {
            Some(officer) => self.schedules.list_for_officer(officer).await?,
            None => self.schedules.list().await?,
        };
        let now = self.clock.now();
        Ok(schedules
            .into_iter()
            .map(|s| s.with_status_at(now))
            .collect())
    }

    pub async fn list_vehicle_requests(
        &self,
        viewer: &UserId,
        filter: RequestFilter,
    ) -> Result<Vec<VehicleRequest>, DomainError> {
        match filter {
            RequestFilter::Mine => self.vehicles.list_requests_by(viewer).await,
            RequestFilter::All => self.vehicles.list_requests().await,
        }
    }

    /// Every vehicle with status derived from the current request table.
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, DomainError> {
        let in_use: HashSet<VehicleId> = self
            .vehicles
            .list_requests()
            .await?
            .into_iter()
            .filter(|r| r.is_active_approved())
            .map(|r| *r.vehicle_id())
            .collect();

        let mut vehicles = self.vehicles.list_vehicles().await?;
        for vehicle in &mut vehicles {
            let active = in_use.contains(vehicle.id());
            vehicle.refresh_status(active);
        }
        Ok(vehicles)
    }

    pub async fn list_conversations(&self, user: &UserId) -> Result<Vec<Conversation>, DomainError> {
        self.conversations.list_for_user(user).await
    }

    /// Messages of a conversation `viewer` takes part in, oldest first.
    pub async fn list_messages(
        &self,
        viewer: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError> {
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ConversationNotFound,
                    format!("Conversation {} not found", conversation_id),
                )
            })?;
        conversation.ensure_participant(viewer)?;
        self.conversations.list_messages(conversation_id).await
    }

    pub async fn list_notifications(
        &self,
        recipient: &UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, DomainError> {
        self.notifications
            .list_for_recipient(recipient, unread_only)
            .await
    }
}
