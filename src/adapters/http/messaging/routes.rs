//! HTTP routes for messaging endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    list_conversations, list_messages, list_notifications, mark_conversation_read,
    mark_notifications_read, send_message, MessagingHandlers,
};

/// Creates the messaging router, mounted under `/api`.
pub fn messaging_routes(handlers: MessagingHandlers) -> Router {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations/:id/messages", get(list_messages))
        .route("/conversations/:id/read", post(mark_conversation_read))
        .route("/messages", post(send_message))
        .route("/notifications", get(list_notifications))
        .route("/notifications/read", post(mark_notifications_read))
        .with_state(handlers)
}
