//! HTTP routes for vehicle endpoints.

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{
    list_vehicle_requests, list_vehicles, register_vehicle, review_vehicle_request,
    submit_vehicle_request, update_vehicle_condition, VehicleHandlers,
};

/// Creates the vehicle router, mounted under `/api`.
pub fn vehicle_routes(handlers: VehicleHandlers) -> Router {
    Router::new()
        .route("/vehicles", get(list_vehicles).post(register_vehicle))
        .route("/vehicles/:id/condition", patch(update_vehicle_condition))
        .route(
            "/vehicle-requests",
            get(list_vehicle_requests).post(submit_vehicle_request),
        )
        .route("/vehicle-requests/:id/review", post(review_vehicle_request))
        .with_state(handlers)
}
