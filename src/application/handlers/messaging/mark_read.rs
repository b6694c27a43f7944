//! Read-receipt handlers for notifications and conversations.

use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::domain::foundation::{CommandMetadata, ConversationId, DomainError, NotificationId};
use crate::domain::messaging::{Conversation, Message, Notification};
use crate::domain::sync::ChangeAction;
use crate::ports::{ConversationRepository, MarkReadScope, NotificationRepository};

// ════════════════════════════════════════════════════════════════════════════════
// Notifications
// ════════════════════════════════════════════════════════════════════════════════

/// Command to mark the actor's notifications read.
#[derive(Debug, Clone)]
pub struct MarkNotificationsReadCommand {
    /// `None` marks every notification for the actor.
    pub ids: Option<Vec<NotificationId>>,
}

pub struct MarkNotificationsReadHandler {
    repository: Arc<dyn NotificationRepository>,
    publisher: Arc<ChangePublisher>,
}

impl MarkNotificationsReadHandler {
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        publisher: Arc<ChangePublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Returns only the notifications that changed.
    pub async fn handle(
        &self,
        cmd: MarkNotificationsReadCommand,
        metadata: CommandMetadata,
    ) -> Result<Vec<Notification>, DomainError> {
        let now = self.publisher.clock().now();
        let scope = match cmd.ids {
            Some(ids) => MarkReadScope::Ids(ids),
            None => MarkReadScope::All,
        };

        let flipped = self
            .repository
            .mark_read(&metadata.actor, scope, now)
            .await?;

        for notification in &flipped {
            self.publisher
                .on_commit(
                    Committed::Notification(notification.clone()),
                    ChangeAction::Update,
                    &metadata,
                )
                .await;
        }

        tracing::debug!(recipient = %metadata.actor, count = flipped.len(), "Notifications read");
        Ok(flipped)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Conversations
// ════════════════════════════════════════════════════════════════════════════════

/// Command to clear the actor's unread flag on a conversation.
#[derive(Debug, Clone)]
pub struct MarkConversationReadCommand {
    pub conversation_id: ConversationId,
}

#[derive(Debug, Clone)]
pub struct MarkConversationReadResult {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

pub struct MarkConversationReadHandler {
    repository: Arc<dyn ConversationRepository>,
    publisher: Arc<ChangePublisher>,
}

impl MarkConversationReadHandler {
    pub fn new(
        repository: Arc<dyn ConversationRepository>,
        publisher: Arc<ChangePublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: MarkConversationReadCommand,
        metadata: CommandMetadata,
    ) -> Result<MarkConversationReadResult, DomainError> {
        let now = self.publisher.clock().now();

        let (conversation, messages) = self
            .repository
            .mark_read(&cmd.conversation_id, &metadata.actor, now)
            .await?;

        self.publisher
            .on_commit(
                Committed::Conversation(conversation.clone()),
                ChangeAction::Update,
                &metadata,
            )
            .await;
        for message in &messages {
            self.publisher
                .on_commit(Committed::Message(message.clone()), ChangeAction::Update, &metadata)
                .await;
        }

        Ok(MarkConversationReadResult {
            conversation,
            messages,
        })
    }
}
