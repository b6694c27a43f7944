//! Broadcast room names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ConversationId, UserId, ValidationError};

const USER_PREFIX: &str = "user:";
const CONVERSATION_PREFIX: &str = "conversation:";
const VEHICLE_REQUESTS: &str = "vehicle-requests";

/// A logical topic that groups subscriber handles.
///
/// Canonical string forms: `user:<id>`, `conversation:<uuid>`,
/// `vehicle-requests`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Room {
    /// Private room of one user; every connection of that user joins it.
    User(UserId),
    /// Room of a two-party conversation.
    Conversation(ConversationId),
    /// Global feed of vehicle request and vehicle changes.
    VehicleRequests,
}

impl Room {
    pub fn user(id: &UserId) -> Self {
        Room::User(id.clone())
    }

    pub fn conversation(id: &ConversationId) -> Self {
        Room::Conversation(*id)
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "{}{}", USER_PREFIX, id),
            Room::Conversation(id) => write!(f, "{}{}", CONVERSATION_PREFIX, id),
            Room::VehicleRequests => f.write_str(VEHICLE_REQUESTS),
        }
    }
}

impl FromStr for Room {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == VEHICLE_REQUESTS {
            return Ok(Room::VehicleRequests);
        }
        if let Some(rest) = s.strip_prefix(USER_PREFIX) {
            return Ok(Room::User(UserId::new(rest)?));
        }
        if let Some(rest) = s.strip_prefix(CONVERSATION_PREFIX) {
            let id = rest
                .parse::<ConversationId>()
                .map_err(|e| ValidationError::invalid_format("room", e.to_string()))?;
            return Ok(Room::Conversation(id));
        }
        Err(ValidationError::invalid_format(
            "room",
            format!("unknown room '{}'", s),
        ))
    }
}

impl TryFrom<String> for Room {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Room> for String {
    fn from(room: Room) -> Self {
        room.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_room_kind() {
        let conv = ConversationId::new();
        assert_eq!(
            "user:officer-3".parse::<Room>().unwrap(),
            Room::User(UserId::new("officer-3").unwrap())
        );
        assert_eq!(
            format!("conversation:{}", conv).parse::<Room>().unwrap(),
            Room::Conversation(conv)
        );
        assert_eq!(
            "vehicle-requests".parse::<Room>().unwrap(),
            Room::VehicleRequests
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        let room = Room::Conversation(ConversationId::new());
        assert_eq!(room.to_string().parse::<Room>().unwrap(), room);
    }

    #[test]
    fn rejects_unknown_and_malformed_rooms() {
        assert!("lobby".parse::<Room>().is_err());
        assert!("user:".parse::<Room>().is_err());
        assert!("conversation:42".parse::<Room>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_string(&Room::VehicleRequests).unwrap(),
            r#""vehicle-requests""#
        );
        let room: Room = serde_json::from_str(r#""user:resident-2""#).unwrap();
        assert_eq!(room, Room::User(UserId::new("resident-2").unwrap()));
    }
}
