//! Vehicle domain module.
//!
//! Vehicles and the usage requests officers file against them. Request
//! status is an explicit state machine; vehicle status is derived from
//! condition plus whether an approved request is currently out.

mod aggregate;
mod condition;
mod request;
mod request_status;

pub use aggregate::Vehicle;
pub use condition::{derive_status, VehicleCondition, VehicleStatus};
pub use request::{validate_transition, RequestAction, VehicleRequest};
pub use request_status::VehicleRequestStatus;
