//! HTTP DTOs for conversation, message and notification endpoints.

use serde::{Deserialize, Serialize};

use crate::adapters::http::error::{ApiError, ApiResult};
use crate::application::handlers::{
    MarkConversationReadResult, MessageTarget, SendMessageResult,
};
use crate::domain::foundation::{ConversationId, NotificationId, UserId};
use crate::domain::messaging::{Conversation, Message};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// A message addressed by conversation or, for a first message, recipient.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub recipient_id: Option<String>,
    pub content: String,
}

impl SendMessageRequest {
    /// Exactly one of `conversationId` and `recipientId` must be present.
    pub fn target(&self) -> ApiResult<MessageTarget> {
        match (&self.conversation_id, &self.recipient_id) {
            (Some(id), None) => Ok(MessageTarget::Conversation(*id)),
            (None, Some(recipient)) => Ok(MessageTarget::Recipient(UserId::new(recipient.clone())?)),
            _ => Err(ApiError::bad_request(
                "Exactly one of conversationId and recipientId is required",
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkNotificationsReadRequest {
    /// Omitted marks every notification of the caller.
    #[serde(default)]
    pub ids: Option<Vec<NotificationId>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub message: Message,
    pub conversation: Conversation,
    pub created_conversation: bool,
}

impl From<SendMessageResult> for SendMessageResponse {
    fn from(result: SendMessageResult) -> Self {
        Self {
            message: result.message,
            conversation: result.conversation,
            created_conversation: result.created_conversation,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReadResponse {
    pub conversation: Conversation,
    /// Messages whose read flag flipped.
    pub messages: Vec<Message>,
}

impl From<MarkConversationReadResult> for ConversationReadResponse {
    fn from(result: MarkConversationReadResult) -> Self {
        Self {
            conversation: result.conversation,
            messages: result.messages,
        }
    }
}
