//! In-app notification.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, NotificationId, Timestamp, UserId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    id: NotificationId,
    recipient: UserId,
    message: String,
    read: bool,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Notification {
    pub fn new(
        id: NotificationId,
        recipient: UserId,
        message: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ValidationError::empty_field("message").into());
        }
        Ok(Self {
            id,
            recipient,
            message,
            read: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    pub fn recipient(&self) -> &UserId {
        &self.recipient
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true if the flag flipped.
    pub fn mark_read(&mut self, now: Timestamp) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        self.updated_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_notification_is_unread() {
        let n = Notification::new(
            NotificationId::new(),
            UserId::new("officer-1").unwrap(),
            "Your vehicle request was approved",
            Timestamp::from_unix_secs(1),
        )
        .unwrap();
        assert!(!n.is_read());
    }

    #[test]
    fn mark_read_flips_once() {
        let mut n = Notification::new(
            NotificationId::new(),
            UserId::new("officer-1").unwrap(),
            "Shift rescheduled",
            Timestamp::from_unix_secs(1),
        )
        .unwrap();
        assert!(n.mark_read(Timestamp::from_unix_secs(2)));
        assert!(!n.mark_read(Timestamp::from_unix_secs(3)));
        assert_eq!(n.updated_at(), Timestamp::from_unix_secs(2));
    }
}
