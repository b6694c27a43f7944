//! Notifier - persists a notification and pushes it to its recipient.
//!
//! Notifications are a side effect of another command. A failure here is
//! logged and never fails the command that caused it.

use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::domain::foundation::{CommandMetadata, DomainError, NotificationId, UserId};
use crate::domain::messaging::Notification;
use crate::domain::sync::ChangeAction;
use crate::ports::NotificationRepository;

pub struct Notifier {
    repository: Arc<dyn NotificationRepository>,
    publisher: Arc<ChangePublisher>,
}

impl Notifier {
    pub fn new(repository: Arc<dyn NotificationRepository>, publisher: Arc<ChangePublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Notifies `recipient`, returning the stored notification.
    pub async fn notify(
        &self,
        recipient: &UserId,
        message: impl Into<String>,
        metadata: &CommandMetadata,
    ) -> Result<Notification, DomainError> {
        let now = self.publisher.clock().now();
        let notification = Notification::new(NotificationId::new(), recipient.clone(), message, now)?;
        self.repository.save(&notification).await?;

        self.publisher
            .on_commit(
                Committed::Notification(notification.clone()),
                ChangeAction::Insert,
                metadata,
            )
            .await;
        Ok(notification)
    }

    /// Notifies every recipient, logging failures instead of returning them.
    pub async fn notify_all<'a>(
        &self,
        recipients: impl IntoIterator<Item = &'a UserId>,
        message: &str,
        metadata: &CommandMetadata,
    ) -> usize {
        let mut sent = 0;
        for recipient in recipients {
            match self.notify(recipient, message, metadata).await {
                Ok(_) => sent += 1,
                Err(e) => {
                    tracing::warn!(recipient = %recipient, "Failed to notify: {}", e);
                }
            }
        }
        sent
    }
}
