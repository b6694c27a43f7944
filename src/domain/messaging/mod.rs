//! Messaging domain module.
//!
//! Two-party conversations, their messages, and per-user notifications.

mod conversation;
mod message;
mod notification;

pub use conversation::{Conversation, LastMessage, Participant};
pub use message::{Message, MAX_MESSAGE_LENGTH};
pub use notification::Notification;
