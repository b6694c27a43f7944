//! Change envelopes delivered over the push channel.
//!
//! An envelope always carries the complete current state of one entity,
//! never a diff, so a receiver can replace by id. The `state` payload is
//! kept as raw JSON on the wire and checked against the schema for its
//! `entityType` by [`ChangeEnvelope::decode`] before any merge.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::{EventId, Timestamp};
use crate::domain::messaging::{Conversation, Message, Notification};
use crate::domain::schedule::Schedule;
use crate::domain::vehicle::{Vehicle, VehicleRequest};

use super::room::Room;

/// Entity type discriminant carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Schedule,
    VehicleRequest,
    Vehicle,
    Conversation,
    Message,
    Notification,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Schedule => "schedule",
            EntityKind::VehicleRequest => "vehicle_request",
            EntityKind::Vehicle => "vehicle",
            EntityKind::Conversation => "conversation",
            EntityKind::Message => "message",
            EntityKind::Notification => "notification",
        };
        f.write_str(s)
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    Insert,
    Update,
    StatusChange,
    Delete,
}

/// Full state of one entity, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityState {
    Schedule(Schedule),
    VehicleRequest(VehicleRequest),
    Vehicle(Vehicle),
    Conversation(Conversation),
    Message(Message),
    Notification(Notification),
}

impl EntityState {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityState::Schedule(_) => EntityKind::Schedule,
            EntityState::VehicleRequest(_) => EntityKind::VehicleRequest,
            EntityState::Vehicle(_) => EntityKind::Vehicle,
            EntityState::Conversation(_) => EntityKind::Conversation,
            EntityState::Message(_) => EntityKind::Message,
            EntityState::Notification(_) => EntityKind::Notification,
        }
    }

    /// String form of the entity's id as carried in `entityId`.
    pub fn entity_id(&self) -> String {
        match self {
            EntityState::Schedule(s) => s.id().to_string(),
            EntityState::VehicleRequest(r) => r.id().to_string(),
            EntityState::Vehicle(v) => v.id().to_string(),
            EntityState::Conversation(c) => c.id().to_string(),
            EntityState::Message(m) => m.id().to_string(),
            EntityState::Notification(n) => n.id().to_string(),
        }
    }

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            EntityState::Schedule(s) => serde_json::to_value(s),
            EntityState::VehicleRequest(r) => serde_json::to_value(r),
            EntityState::Vehicle(v) => serde_json::to_value(v),
            EntityState::Conversation(c) => serde_json::to_value(c),
            EntityState::Message(m) => serde_json::to_value(m),
            EntityState::Notification(n) => serde_json::to_value(n),
        }
    }
}

/// Boundary errors raised while validating an incoming envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to encode {kind} state: {source}")]
    Encode {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("state does not match the {kind} schema: {source}")]
    Schema {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("envelope entityId {declared} does not match state id {actual}")]
    IdMismatch { declared: String, actual: String },
}

/// Event payload published to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEnvelope {
    pub event_id: EventId,
    pub room: Room,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub action: ChangeAction,
    pub state: serde_json::Value,
    pub occurred_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ChangeEnvelope {
    /// Builds an envelope carrying the full state of `entity`.
    pub fn new(
        room: Room,
        action: ChangeAction,
        entity: &EntityState,
        occurred_at: Timestamp,
    ) -> Result<Self, EnvelopeError> {
        let kind = entity.kind();
        let state = entity
            .to_json()
            .map_err(|source| EnvelopeError::Encode { kind, source })?;
        Ok(Self {
            event_id: EventId::new(),
            room,
            entity_type: kind,
            entity_id: entity.entity_id(),
            action,
            state,
            occurred_at,
            correlation_id: None,
        })
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Re-addresses a copy of this envelope to another room.
    ///
    /// The event id is kept so receivers in several rooms can tell the
    /// copies apart from distinct changes.
    pub fn for_room(&self, room: Room) -> Self {
        Self {
            room,
            ..self.clone()
        }
    }

    /// Validates `state` against the schema for `entity_type`.
    pub fn decode(&self) -> Result<EntityState, EnvelopeError> {
        let kind = self.entity_type;
        let value = self.state.clone();
        let schema = |source| EnvelopeError::Schema { kind, source };

        let entity = match kind {
            EntityKind::Schedule => EntityState::Schedule(serde_json::from_value(value).map_err(schema)?),
            EntityKind::VehicleRequest => {
                EntityState::VehicleRequest(serde_json::from_value(value).map_err(schema)?)
            }
            EntityKind::Vehicle => EntityState::Vehicle(serde_json::from_value(value).map_err(schema)?),
            EntityKind::Conversation => {
                EntityState::Conversation(serde_json::from_value(value).map_err(schema)?)
            }
            EntityKind::Message => EntityState::Message(serde_json::from_value(value).map_err(schema)?),
            EntityKind::Notification => {
                EntityState::Notification(serde_json::from_value(value).map_err(schema)?)
            }
        };

        let actual = entity.entity_id();
        if actual != self.entity_id {
            return Err(EnvelopeError::IdMismatch {
                declared: self.entity_id.clone(),
                actual,
            });
        }
        Ok(entity)
    }
}
