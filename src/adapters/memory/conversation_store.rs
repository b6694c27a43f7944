//! In-memory conversation and message store.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, MessageId, Timestamp, UserId,
};
use crate::domain::messaging::{Conversation, Message};
use crate::ports::{ConversationRepository, ResolvedConversation};

#[derive(Default)]
struct Tables {
    conversations: HashMap<ConversationId, Conversation>,
    by_pair: HashMap<(UserId, UserId), ConversationId>,
    messages: HashMap<ConversationId, BTreeMap<MessageId, Message>>,
    last_message_id: u64,
}

/// Conversation repository with a single global message sequence.
#[derive(Default)]
pub struct InMemoryConversationStore {
    tables: Mutex<Tables>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: &ConversationId) -> DomainError {
    DomainError::new(
        ErrorCode::ConversationNotFound,
        format!("Conversation {} not found", id),
    )
}

#[async_trait]
impl ConversationRepository for InMemoryConversationStore {
    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, DomainError> {
        Ok(self.tables.lock().await.conversations.get(id).cloned())
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Conversation>, DomainError> {
        let mut conversations: Vec<Conversation> = self
            .tables
            .lock()
            .await
            .conversations
            .values()
            .filter(|c| c.involves(user))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(conversations)
    }

    async fn get_or_create(
        &self,
        a: &UserId,
        b: &UserId,
        now: Timestamp,
    ) -> Result<ResolvedConversation, DomainError> {
        let mut tables = self.tables.lock().await;
        let key = Conversation::pair_key(a, b);

        if let Some(existing) = tables
            .by_pair
            .get(&key)
            .and_then(|id| tables.conversations.get(id))
        {
            return Ok(ResolvedConversation {
                conversation: existing.clone(),
                created: false,
            });
        }

        let conversation = Conversation::new(ConversationId::new(), a.clone(), b.clone(), now)?;
        tables.by_pair.insert(key, *conversation.id());
        tables
            .conversations
            .insert(*conversation.id(), conversation.clone());
        Ok(ResolvedConversation {
            conversation,
            created: true,
        })
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        sender: &UserId,
        content: &str,
        now: Timestamp,
    ) -> Result<(Message, Conversation), DomainError> {
        let mut tables = self.tables.lock().await;

        let mut conversation = tables
            .conversations
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| not_found(conversation_id))?;
        conversation.ensure_participant(sender)?;

        let id = MessageId::new(tables.last_message_id + 1);
        let message = Message::new(id, *conversation_id, sender.clone(), content, now)?;
        conversation.record_message(&message)?;

        tables.last_message_id = id.value();
        tables
            .messages
            .entry(*conversation_id)
            .or_default()
            .insert(id, message.clone());
        tables
            .conversations
            .insert(*conversation_id, conversation.clone());
        Ok((message, conversation))
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError> {
        let tables = self.tables.lock().await;
        if !tables.conversations.contains_key(conversation_id) {
            return Err(not_found(conversation_id));
        }
        Ok(tables
            .messages
            .get(conversation_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn mark_read(
        &self,
        conversation_id: &ConversationId,
        reader: &UserId,
        now: Timestamp,
    ) -> Result<(Conversation, Vec<Message>), DomainError> {
        let mut tables = self.tables.lock().await;

        let mut conversation = tables
            .conversations
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| not_found(conversation_id))?;
        conversation.mark_read(reader, now)?;

        let mut flipped = Vec::new();
        if let Some(messages) = tables.messages.get_mut(conversation_id) {
            for message in messages.values_mut() {
                if message.sender() != reader && message.mark_read() {
                    flipped.push(message.clone());
                }
            }
        }

        tables
            .conversations
            .insert(*conversation_id, conversation.clone());
        Ok((conversation, flipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn get_or_create_returns_same_conversation_for_either_order() {
        let store = InMemoryConversationStore::new();
        let first = store
            .get_or_create(&user("a"), &user("b"), Timestamp::from_unix_secs(1))
            .await
            .unwrap();
        let second = store
            .get_or_create(&user("b"), &user("a"), Timestamp::from_unix_secs(2))
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.conversation.id(), second.conversation.id());
    }

    #[tokio::test]
    async fn racing_first_messages_share_one_conversation() {
        let store = Arc::new(InMemoryConversationStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .get_or_create(&user("a"), &user("b"), Timestamp::now())
                    .await
                    .unwrap()
                    .created
            }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn message_ids_increase_across_conversations() {
        let store = InMemoryConversationStore::new();
        let ab = store
            .get_or_create(&user("a"), &user("b"), Timestamp::now())
            .await
            .unwrap()
            .conversation;
        let ac = store
            .get_or_create(&user("a"), &user("c"), Timestamp::now())
            .await
            .unwrap()
            .conversation;

        let (m1, _) = store
            .append_message(ab.id(), &user("a"), "one", Timestamp::now())
            .await
            .unwrap();
        let (m2, _) = store
            .append_message(ac.id(), &user("c"), "two", Timestamp::now())
            .await
            .unwrap();
        assert!(m2.id() > m1.id());
    }

    #[tokio::test]
    async fn outsider_cannot_append() {
        let store = InMemoryConversationStore::new();
        let conv = store
            .get_or_create(&user("a"), &user("b"), Timestamp::now())
            .await
            .unwrap()
            .conversation;
        let err = store
            .append_message(conv.id(), &user("z"), "hi", Timestamp::now())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn mark_read_flips_only_incoming_messages() {
        let store = InMemoryConversationStore::new();
        let conv = store
            .get_or_create(&user("a"), &user("b"), Timestamp::now())
            .await
            .unwrap()
            .conversation;
        store
            .append_message(conv.id(), &user("a"), "from a", Timestamp::from_unix_secs(1))
            .await
            .unwrap();
        store
            .append_message(conv.id(), &user("b"), "from b", Timestamp::from_unix_secs(2))
            .await
            .unwrap();

        let (updated, flipped) = store
            .mark_read(conv.id(), &user("b"), Timestamp::from_unix_secs(3))
            .await
            .unwrap();
        assert_eq!(flipped.len(), 1);
        assert_eq!(flipped[0].sender(), &user("a"));
        assert_eq!(updated.has_read(&user("b")), Some(true));
    }
}
