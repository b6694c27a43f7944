//! In-memory notification store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, NotificationId, Timestamp, UserId};
use crate::domain::messaging::Notification;
use crate::ports::{MarkReadScope, NotificationRepository};

#[derive(Default)]
pub struct InMemoryNotificationStore {
    notifications: RwLock<HashMap<NotificationId, Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationStore {
    async fn save(&self, notification: &Notification) -> Result<(), DomainError> {
        self.notifications
            .write()
            .await
            .insert(*notification.id(), notification.clone());
        Ok(())
    }

    async fn list_for_recipient(
        &self,
        recipient: &UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, DomainError> {
        let mut listed: Vec<Notification> = self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| n.recipient() == recipient && (!unread_only || !n.is_read()))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(a.id().cmp(b.id())));
        Ok(listed)
    }

    async fn mark_read(
        &self,
        recipient: &UserId,
        scope: MarkReadScope,
        now: Timestamp,
    ) -> Result<Vec<Notification>, DomainError> {
        let mut notifications = self.notifications.write().await;
        let mut flipped = Vec::new();

        for notification in notifications.values_mut() {
            if notification.recipient() != recipient {
                continue;
            }
            let in_scope = match &scope {
                MarkReadScope::All => true,
                MarkReadScope::Ids(ids) => ids.contains(notification.id()),
            };
            if in_scope && notification.mark_read(now) {
                flipped.push(notification.clone());
            }
        }
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn seeded() -> (InMemoryNotificationStore, Vec<NotificationId>) {
        let store = InMemoryNotificationStore::new();
        let mut ids = Vec::new();
        for (i, who) in ["o-1", "o-1", "o-2"].iter().enumerate() {
            let n = Notification::new(
                NotificationId::new(),
                user(who),
                format!("note {}", i),
                Timestamp::from_unix_secs(i as i64),
            )
            .unwrap();
            ids.push(*n.id());
            store.save(&n).await.unwrap();
        }
        (store, ids)
    }

    #[tokio::test]
    async fn unread_filter_excludes_read_notifications() {
        let (store, ids) = seeded().await;
        store
            .mark_read(&user("o-1"), MarkReadScope::Ids(vec![ids[0]]), Timestamp::now())
            .await
            .unwrap();

        assert_eq!(store.list_for_recipient(&user("o-1"), true).await.unwrap().len(), 1);
        assert_eq!(store.list_for_recipient(&user("o-1"), false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn mark_read_ignores_other_recipients_ids() {
        let (store, ids) = seeded().await;
        let flipped = store
            .mark_read(&user("o-1"), MarkReadScope::Ids(vec![ids[2]]), Timestamp::now())
            .await
            .unwrap();
        assert!(flipped.is_empty());
    }

    #[tokio::test]
    async fn mark_all_returns_only_flipped() {
        let (store, _) = seeded().await;
        let first = store
            .mark_read(&user("o-1"), MarkReadScope::All, Timestamp::now())
            .await
            .unwrap();
        let second = store
            .mark_read(&user("o-1"), MarkReadScope::All, Timestamp::now())
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
    }
}
