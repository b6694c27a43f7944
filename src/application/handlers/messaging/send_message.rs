//! SendMessageHandler - Command handler for direct messages.
//!
//! A first message to someone may name only the recipient. The
//! conversation for the pair is found or created in the same step, so a
//! client can hold an unsaved draft until the reply arrives.

use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::domain::foundation::{CommandMetadata, ConversationId, DomainError, ErrorCode, UserId};
use crate::domain::messaging::{Conversation, Message};
use crate::domain::sync::ChangeAction;
use crate::ports::ConversationRepository;

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    Conversation(ConversationId),
    Recipient(UserId),
}

/// Command to send a message. The sender is the command's actor.
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub target: MessageTarget,
    pub content: String,
}

/// Result of a sent message.
#[derive(Debug, Clone)]
pub struct SendMessageResult {
    pub message: Message,
    pub conversation: Conversation,
    /// True when this message materialised the conversation.
    pub created_conversation: bool,
}

/// Handler for sending messages.
pub struct SendMessageHandler {
    repository: Arc<dyn ConversationRepository>,
    publisher: Arc<ChangePublisher>,
}

impl SendMessageHandler {
    pub fn new(repository: Arc<dyn ConversationRepository>, publisher: Arc<ChangePublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: SendMessageCommand,
        metadata: CommandMetadata,
    ) -> Result<SendMessageResult, DomainError> {
        let now = self.publisher.clock().now();
        let sender = metadata.actor.clone();

        // 1. Resolve the conversation
        let (conversation_id, created) = match cmd.target {
            MessageTarget::Conversation(id) => {
                let conversation = self
                    .repository
                    .find_conversation(&id)
                    .await?
                    .ok_or_else(|| {
                        DomainError::new(
                            ErrorCode::ConversationNotFound,
                            format!("Conversation {} not found", id),
                        )
                    })?;
                conversation.ensure_participant(&sender)?;
                (id, None)
            }
            MessageTarget::Recipient(recipient) => {
                let resolved = self
                    .repository
                    .get_or_create(&sender, &recipient, now)
                    .await?;
                let id = *resolved.conversation.id();
                (id, resolved.created.then_some(resolved.conversation))
            }
        };

        // 2. Append
        let (message, conversation) = self
            .repository
            .append_message(&conversation_id, &sender, &cmd.content, now)
            .await?;

        // 3. Publish
        let created_conversation = created.is_some();
        if let Some(fresh) = created {
            self.publisher
                .on_commit(Committed::Conversation(fresh), ChangeAction::Insert, &metadata)
                .await;
        }
        self.publisher
            .on_commit(Committed::Message(message.clone()), ChangeAction::Insert, &metadata)
            .await;
        self.publisher
            .on_commit(
                Committed::Conversation(conversation.clone()),
                ChangeAction::Update,
                &metadata,
            )
            .await;

        tracing::debug!(
            conversation_id = %conversation_id,
            message_id = %message.id(),
            created = created_conversation,
            "Message sent"
        );

        Ok(SendMessageResult {
            message,
            conversation,
            created_conversation,
        })
    }
}
