//! Notification repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, NotificationId, Timestamp, UserId};
use crate::domain::messaging::Notification;

/// Which notifications to mark read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkReadScope {
    Ids(Vec<NotificationId>),
    All,
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn save(&self, notification: &Notification) -> Result<(), DomainError>;

    /// Notifications for `recipient`, newest first.
    async fn list_for_recipient(
        &self,
        recipient: &UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, DomainError>;

    /// Marks notifications of `recipient` read.
    ///
    /// Ids belonging to another recipient are ignored. Returns only the
    /// notifications whose flag flipped.
    async fn mark_read(
        &self,
        recipient: &UserId,
        scope: MarkReadScope,
        now: Timestamp,
    ) -> Result<Vec<Notification>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn NotificationRepository) {}
    }
}
