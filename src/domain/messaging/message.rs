//! Chat message.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ConversationId, DomainError, MessageId, Timestamp, UserId, ValidationError,
};

/// Longest message body accepted.
pub const MAX_MESSAGE_LENGTH: usize = 2_000;

/// A message in a two-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: MessageId,
    conversation_id: ConversationId,
    sender: UserId,
    content: String,
    created_at: Timestamp,
    read: bool,
}

impl Message {
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        sender: UserId,
        content: impl Into<String>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::empty_field("content").into());
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ValidationError::out_of_range(
                "content",
                1,
                MAX_MESSAGE_LENGTH as i64,
                content.chars().count() as i64,
            )
            .into());
        }
        Ok(Self {
            id,
            conversation_id,
            sender,
            content,
            created_at,
            read: false,
        })
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn sender(&self) -> &UserId {
        &self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    /// Returns true if the flag flipped.
    pub fn mark_read(&mut self) -> bool {
        let changed = !self.read;
        self.read = true;
        changed
    }
}
