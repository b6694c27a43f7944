//! Application handlers.
//!
//! Every mutation handler follows the same shape: load, apply the domain
//! transition, commit with a conditional write, then hand the committed
//! state to the [`ChangePublisher`](crate::application::ChangePublisher).

pub mod messaging;
pub mod schedule;
pub mod vehicle;

mod notifier;

pub use messaging::{
    MarkConversationReadCommand, MarkConversationReadHandler, MarkConversationReadResult,
    MarkNotificationsReadCommand, MarkNotificationsReadHandler, MessageTarget,
    SendMessageCommand, SendMessageHandler, SendMessageResult,
};
pub use notifier::Notifier;
pub use schedule::{
    CreateScheduleCommand, CreateScheduleHandler, CreateScheduleResult, DeleteScheduleCommand,
    DeleteScheduleHandler, UpdateScheduleCommand, UpdateScheduleHandler, UpdateScheduleResult,
};
pub use vehicle::{
    RegisterVehicleCommand, RegisterVehicleHandler, ReviewVehicleRequestCommand,
    ReviewVehicleRequestHandler, ReviewVehicleRequestResult, SubmitVehicleRequestCommand,
    SubmitVehicleRequestHandler, UpdateVehicleConditionCommand, UpdateVehicleConditionHandler,
};
