//! Two-party conversation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, MessageId, Timestamp, UserId,
};

use super::message::Message;

/// One side of a conversation with its read flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: UserId,
    pub has_read: bool,
}

/// Cached summary of the newest message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub message_id: MessageId,
    pub sender: UserId,
    pub content: String,
    pub created_at: Timestamp,
}

/// A private conversation between exactly two users.
///
/// Participants are stored in sorted order so a pair maps to one
/// conversation regardless of who wrote first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    id: ConversationId,
    participants: [Participant; 2],
    last_message: Option<LastMessage>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Conversation {
    /// Opens a conversation between two distinct users.
    pub fn new(
        id: ConversationId,
        a: UserId,
        b: UserId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::validation(
                "participants",
                "A conversation needs two different participants",
            ));
        }
        let (first, second) = Self::ordered(a, b);
        Ok(Self {
            id,
            participants: [
                Participant {
                    user_id: first,
                    has_read: true,
                },
                Participant {
                    user_id: second,
                    has_read: true,
                },
            ],
            last_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Canonical key for a participant pair.
    pub fn pair_key(a: &UserId, b: &UserId) -> (UserId, UserId) {
        Self::ordered(a.clone(), b.clone())
    }

    fn ordered(a: UserId, b: UserId) -> (UserId, UserId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn participants(&self) -> &[Participant; 2] {
        &self.participants
    }

    pub fn participant_ids(&self) -> impl Iterator<Item = &UserId> {
        self.participants.iter().map(|p| &p.user_id)
    }

    pub fn key(&self) -> (UserId, UserId) {
        (
            self.participants[0].user_id.clone(),
            self.participants[1].user_id.clone(),
        )
    }

    pub fn last_message(&self) -> Option<&LastMessage> {
        self.last_message.as_ref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn involves(&self, user: &UserId) -> bool {
        self.participants.iter().any(|p| &p.user_id == user)
    }

    /// Returns the participant who is not `user`.
    pub fn other_participant(&self, user: &UserId) -> Option<&UserId> {
        if !self.involves(user) {
            return None;
        }
        self.participant_ids().find(|id| *id != user)
    }

    /// Read flag for `user`, if they take part.
    pub fn has_read(&self, user: &UserId) -> Option<bool> {
        self.participants
            .iter()
            .find(|p| &p.user_id == user)
            .map(|p| p.has_read)
    }

    /// Updates the last-message cache and read flags for a new message.
    pub fn record_message(&mut self, message: &Message) -> Result<(), DomainError> {
        if message.conversation_id() != &self.id {
            return Err(DomainError::validation(
                "conversation_id",
                "Message belongs to another conversation",
            ));
        }
        self.ensure_participant(message.sender())?;

        for participant in &mut self.participants {
            participant.has_read = &participant.user_id == message.sender();
        }
        self.last_message = Some(LastMessage {
            message_id: message.id(),
            sender: message.sender().clone(),
            content: message.content().to_string(),
            created_at: message.created_at(),
        });
        // A mark-read may already have moved the clock past this message.
        self.updated_at = self.updated_at.max(message.created_at());
        Ok(())
    }

    /// Marks the conversation read for `user`. Returns true if it changed.
    pub fn mark_read(&mut self, user: &UserId, now: Timestamp) -> Result<bool, DomainError> {
        self.ensure_participant(user)?;
        let participant = self.participants.iter_mut().find(|p| &p.user_id == user);
        match participant {
            Some(p) if !p.has_read => {
                p.has_read = true;
                self.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn ensure_participant(&self, user: &UserId) -> Result<(), DomainError> {
        if self.involves(user) {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::Forbidden,
                format!("User {} is not part of conversation {}", user, self.id),
            ))
        }
    }
}
