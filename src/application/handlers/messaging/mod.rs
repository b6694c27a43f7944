//! Messaging command handlers.

mod mark_read;
mod send_message;

pub use mark_read::{
    MarkConversationReadCommand, MarkConversationReadHandler, MarkConversationReadResult,
    MarkNotificationsReadCommand, MarkNotificationsReadHandler,
};
pub use send_message::{MessageTarget, SendMessageCommand, SendMessageHandler, SendMessageResult};
