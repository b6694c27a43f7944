//! Schedule HTTP adapter.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::ScheduleHandlers;
pub use routes::schedule_routes;
