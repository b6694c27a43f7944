//! Conversation and message repository port.

use async_trait::async_trait;

use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};
use crate::domain::messaging::{Conversation, Message};

/// Result of resolving a participant pair to a conversation.
#[derive(Debug, Clone)]
pub struct ResolvedConversation {
    pub conversation: Conversation,
    /// True if this call materialised it.
    pub created: bool,
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, DomainError>;

    /// Conversations `user` takes part in, most recently updated first.
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Conversation>, DomainError>;

    /// Returns the conversation for the pair, creating it if needed.
    ///
    /// Find and create happen under one lock so two first messages racing
    /// each other still produce a single conversation.
    async fn get_or_create(
        &self,
        a: &UserId,
        b: &UserId,
        now: Timestamp,
    ) -> Result<ResolvedConversation, DomainError>;

    /// Allocates the next message id, stores the message and updates the
    /// conversation's last-message cache in one step.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation is gone
    /// - `Forbidden` if `sender` is not a participant
    /// - `ValidationFailed` for empty or oversized content
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        sender: &UserId,
        content: &str,
        now: Timestamp,
    ) -> Result<(Message, Conversation), DomainError>;

    /// Messages in a conversation ordered by id.
    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError>;

    /// Marks the conversation and every message not sent by `reader` as read.
    ///
    /// Returns the conversation and the messages whose flag flipped.
    async fn mark_read(
        &self,
        conversation_id: &ConversationId,
        reader: &UserId,
        now: Timestamp,
    ) -> Result<(Conversation, Vec<Message>), DomainError>;
}
