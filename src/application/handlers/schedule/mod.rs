//! Schedule command handlers.

mod create_schedule;
mod delete_schedule;
mod update_schedule;

pub use create_schedule::{CreateScheduleCommand, CreateScheduleHandler, CreateScheduleResult};
pub use delete_schedule::{DeleteScheduleCommand, DeleteScheduleHandler};
pub use update_schedule::{UpdateScheduleCommand, UpdateScheduleHandler, UpdateScheduleResult};
