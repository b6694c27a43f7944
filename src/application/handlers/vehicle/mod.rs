//! Vehicle and vehicle request command handlers.

mod register_vehicle;
mod review_request;
mod submit_request;
mod update_condition;

pub use register_vehicle::{RegisterVehicleCommand, RegisterVehicleHandler};
pub use review_request::{
    ReviewVehicleRequestCommand, ReviewVehicleRequestHandler, ReviewVehicleRequestResult,
};
pub use submit_request::{SubmitVehicleRequestCommand, SubmitVehicleRequestHandler};
pub use update_condition::{UpdateVehicleConditionCommand, UpdateVehicleConditionHandler};
