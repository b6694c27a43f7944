//! HTTP handlers for messaging endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::adapters::http::error::{parse_id, ApiResult};
use crate::adapters::http::identity::Caller;
use crate::application::handlers::{
    MarkConversationReadCommand, MarkConversationReadHandler, MarkNotificationsReadCommand,
    MarkNotificationsReadHandler, SendMessageCommand, SendMessageHandler,
};
use crate::application::SyncQueries;
use crate::domain::messaging::{Conversation, Message, Notification};

use super::dto::{
    ConversationReadResponse, ListNotificationsQuery, MarkNotificationsReadRequest,
    SendMessageRequest, SendMessageResponse,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct MessagingHandlers {
    send_handler: Arc<SendMessageHandler>,
    conversation_read_handler: Arc<MarkConversationReadHandler>,
    notifications_read_handler: Arc<MarkNotificationsReadHandler>,
    queries: SyncQueries,
}

impl MessagingHandlers {
    pub fn new(
        send_handler: Arc<SendMessageHandler>,
        conversation_read_handler: Arc<MarkConversationReadHandler>,
        notifications_read_handler: Arc<MarkNotificationsReadHandler>,
        queries: SyncQueries,
    ) -> Self {
        Self {
            send_handler,
            conversation_read_handler,
            notifications_read_handler,
            queries,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// GET /api/conversations - The caller's conversations
pub async fn list_conversations(
    State(handlers): State<MessagingHandlers>,
    caller: Caller,
) -> ApiResult<Json<Vec<Conversation>>> {
    let conversations = handlers.queries.list_conversations(&caller.user_id).await?;
    Ok(Json(conversations))
}

/// GET /api/conversations/:id/messages - Messages, oldest first
pub async fn list_messages(
    State(handlers): State<MessagingHandlers>,
    caller: Caller,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let conversation_id = parse_id(&conversation_id, "conversation ID")?;
    let messages = handlers
        .queries
        .list_messages(&caller.user_id, &conversation_id)
        .await?;
    Ok(Json(messages))
}

/// POST /api/messages - Send a message, creating the conversation if needed
pub async fn send_message(
    State(handlers): State<MessagingHandlers>,
    caller: Caller,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<SendMessageResponse>)> {
    let cmd = SendMessageCommand {
        target: req.target()?,
        content: req.content,
    };

    let result = handlers.send_handler.handle(cmd, caller.metadata()).await?;
    Ok((StatusCode::CREATED, Json(result.into())))
}

/// POST /api/conversations/:id/read - Clear the caller's unread state
pub async fn mark_conversation_read(
    State(handlers): State<MessagingHandlers>,
    caller: Caller,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<ConversationReadResponse>> {
    let cmd = MarkConversationReadCommand {
        conversation_id: parse_id(&conversation_id, "conversation ID")?,
    };

    let result = handlers
        .conversation_read_handler
        .handle(cmd, caller.metadata())
        .await?;
    Ok(Json(result.into()))
}

/// GET /api/notifications?unreadOnly=true|false
pub async fn list_notifications(
    State(handlers): State<MessagingHandlers>,
    caller: Caller,
    Query(query): Query<ListNotificationsQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = handlers
        .queries
        .list_notifications(&caller.user_id, query.unread_only)
        .await?;
    Ok(Json(notifications))
}

/// POST /api/notifications/read - Mark some or all notifications read
pub async fn mark_notifications_read(
    State(handlers): State<MessagingHandlers>,
    caller: Caller,
    Json(req): Json<MarkNotificationsReadRequest>,
) -> ApiResult<Json<Vec<Notification>>> {
    let cmd = MarkNotificationsReadCommand { ids: req.ids };
    let changed = handlers
        .notifications_read_handler
        .handle(cmd, caller.metadata())
        .await?;
    Ok(Json(changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Harness;
    use crate::domain::foundation::UserId;
    use axum::response::IntoResponse;

    fn handlers(h: &Harness) -> MessagingHandlers {
        MessagingHandlers::new(
            Arc::new(SendMessageHandler::new(
                h.conversations.clone(),
                h.publisher.clone(),
            )),
            Arc::new(MarkConversationReadHandler::new(
                h.conversations.clone(),
                h.publisher.clone(),
            )),
            Arc::new(MarkNotificationsReadHandler::new(
                h.notifications.clone(),
                h.publisher.clone(),
            )),
            h.queries(),
        )
    }

    fn caller(id: &str) -> Caller {
        Caller {
            user_id: UserId::new(id).unwrap(),
            correlation_id: "req-1".to_string(),
        }
    }

    fn to(recipient: &str, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            conversation_id: None,
            recipient_id: Some(recipient.to_string()),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn first_message_creates_conversation_and_read_clears_it() {
        let h = Harness::at(0);
        let state = handlers(&h);

        let (status, Json(sent)) = send_message(State(state.clone()), caller("o-1"), Json(to("o-2", "hello")))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(sent.created_conversation);

        let conversation_id = sent.conversation.id().to_string();
        let Json(messages) = list_messages(
            State(state.clone()),
            caller("o-2"),
            Path(conversation_id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(messages.len(), 1);

        let Json(read) = mark_conversation_read(State(state), caller("o-2"), Path(conversation_id))
            .await
            .unwrap();
        assert_eq!(read.conversation.has_read(&UserId::new("o-2").unwrap()), Some(true));
        assert_eq!(read.messages.len(), 1);
    }

    #[tokio::test]
    async fn outsider_cannot_list_messages() {
        let h = Harness::at(0);
        let state = handlers(&h);
        let (_, Json(sent)) = send_message(State(state.clone()), caller("o-1"), Json(to("o-2", "hello")))
            .await
            .unwrap();

        let response = list_messages(
            State(state),
            caller("o-3"),
            Path(sent.conversation.id().to_string()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn messaging_yourself_is_rejected() {
        let h = Harness::at(0);
        let response = send_message(State(handlers(&h)), caller("o-1"), Json(to("o-1", "me")))
            .await
            .into_response();
        assert!(response.status().is_client_error());
    }
}
