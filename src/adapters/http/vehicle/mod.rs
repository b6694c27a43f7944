//! Vehicle and vehicle request HTTP adapter.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::VehicleHandlers;
pub use routes::vehicle_routes;
