//! HTTP adapters - REST surface for pulls and mutations.
//!
//! Every list endpoint returns the full current collection, the same
//! entity shape a push envelope carries. Every mutation goes through an
//! application handler, which publishes after commit.
//!
//! The caller is identified by the `x-user-id` header; see [`identity`].

pub mod error;
pub mod identity;
pub mod messaging;
pub mod pull_client;
pub mod schedule;
pub mod vehicle;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use identity::Caller;
pub use messaging::{messaging_routes, MessagingHandlers};
pub use pull_client::HttpPullSource;
pub use schedule::{schedule_routes, ScheduleHandlers};
pub use vehicle::{vehicle_routes, VehicleHandlers};

use axum::Router;

/// All REST routes, nested under `/api`.
pub fn api_router(
    schedules: ScheduleHandlers,
    vehicles: VehicleHandlers,
    messaging: MessagingHandlers,
) -> Router {
    let api = Router::new()
        .merge(schedule_routes(schedules))
        .merge(vehicle_routes(vehicles))
        .merge(messaging_routes(messaging));
    Router::new().nest("/api", api)
}
