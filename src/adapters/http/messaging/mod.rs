//! Conversation, message and notification HTTP adapter.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::MessagingHandlers;
pub use routes::messaging_routes;
