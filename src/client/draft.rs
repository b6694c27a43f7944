//! Client-side placeholder for a conversation that does not exist yet.
//!
//! Opening a chat with someone new shows an empty thread immediately. The
//! server only creates the conversation when the first message is sent, so
//! until the reconciled conversation list contains the pair the thread is a
//! draft addressed by recipient.

use crate::application::MessageTarget;
use crate::domain::foundation::{ConversationId, DomainError, UserId};
use crate::domain::messaging::Conversation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftConversation {
    viewer: UserId,
    recipient: UserId,
}

impl DraftConversation {
    pub fn new(viewer: UserId, recipient: UserId) -> Result<Self, DomainError> {
        if viewer == recipient {
            return Err(DomainError::validation(
                "recipient",
                "Cannot start a conversation with yourself",
            ));
        }
        Ok(Self { viewer, recipient })
    }

    pub fn recipient(&self) -> &UserId {
        &self.recipient
    }

    /// The persisted conversation for this pair, if one has arrived.
    pub fn resolve<'a>(&self, conversations: &'a [Conversation]) -> Option<&'a Conversation> {
        let key = Conversation::pair_key(&self.viewer, &self.recipient);
        conversations.iter().find(|c| c.key() == key)
    }
}

/// A thread as the client currently knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationRef {
    Draft(DraftConversation),
    Persisted(ConversationId),
}

impl ConversationRef {
    /// Swaps a draft for its persisted id once the pair shows up.
    pub fn resolve(self, conversations: &[Conversation]) -> Self {
        match self {
            ConversationRef::Draft(draft) => match draft.resolve(conversations) {
                Some(conversation) => ConversationRef::Persisted(*conversation.id()),
                None => ConversationRef::Draft(draft),
            },
            persisted => persisted,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, ConversationRef::Draft(_))
    }

    /// Where the next message should be sent.
    pub fn message_target(&self) -> MessageTarget {
        match self {
            ConversationRef::Draft(draft) => MessageTarget::Recipient(draft.recipient.clone()),
            ConversationRef::Persisted(id) => MessageTarget::Conversation(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn draft_targets_recipient_until_resolved() {
        let draft = ConversationRef::Draft(DraftConversation::new(user("a"), user("b")).unwrap());
        assert_eq!(draft.message_target(), MessageTarget::Recipient(user("b")));

        let unrelated =
            Conversation::new(ConversationId::new(), user("a"), user("c"), Timestamp::now()).unwrap();
        let still = draft.resolve(&[unrelated.clone()]);
        assert!(still.is_draft());

        let mine =
            Conversation::new(ConversationId::new(), user("b"), user("a"), Timestamp::now()).unwrap();
        let resolved = still.resolve(&[unrelated, mine.clone()]);
        assert_eq!(resolved, ConversationRef::Persisted(*mine.id()));
        assert_eq!(resolved.message_target(), MessageTarget::Conversation(*mine.id()));
    }

    #[test]
    fn draft_with_self_is_rejected() {
        assert!(DraftConversation::new(user("a"), user("a")).is_err());
    }
}
