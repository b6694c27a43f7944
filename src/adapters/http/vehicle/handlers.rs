//! HTTP handlers for vehicle and vehicle request endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::adapters::http::error::{parse_id, ApiResult};
use crate::adapters::http::identity::Caller;
use crate::application::handlers::{
    RegisterVehicleCommand, RegisterVehicleHandler, ReviewVehicleRequestCommand,
    ReviewVehicleRequestHandler, SubmitVehicleRequestCommand, SubmitVehicleRequestHandler,
    UpdateVehicleConditionCommand, UpdateVehicleConditionHandler,
};
use crate::application::SyncQueries;
use crate::domain::foundation::UserId;
use crate::domain::vehicle::{Vehicle, VehicleRequest};

use super::dto::{
    ListRequestsQuery, RegisterVehicleRequest, ReviewRequestBody, ReviewResponse,
    SubmitRequestBody, UpdateConditionRequest,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct VehicleHandlers {
    register_handler: Arc<RegisterVehicleHandler>,
    condition_handler: Arc<UpdateVehicleConditionHandler>,
    submit_handler: Arc<SubmitVehicleRequestHandler>,
    review_handler: Arc<ReviewVehicleRequestHandler>,
    queries: SyncQueries,
}

impl VehicleHandlers {
    pub fn new(
        register_handler: Arc<RegisterVehicleHandler>,
        condition_handler: Arc<UpdateVehicleConditionHandler>,
        submit_handler: Arc<SubmitVehicleRequestHandler>,
        review_handler: Arc<ReviewVehicleRequestHandler>,
        queries: SyncQueries,
    ) -> Self {
        Self {
            register_handler,
            condition_handler,
            submit_handler,
            review_handler,
            queries,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// GET /api/vehicles - Every vehicle with status derived now
pub async fn list_vehicles(
    State(handlers): State<VehicleHandlers>,
    _caller: Caller,
) -> ApiResult<Json<Vec<Vehicle>>> {
    Ok(Json(handlers.queries.list_vehicles().await?))
}

/// POST /api/vehicles - Register a vehicle
pub async fn register_vehicle(
    State(handlers): State<VehicleHandlers>,
    caller: Caller,
    Json(req): Json<RegisterVehicleRequest>,
) -> ApiResult<(StatusCode, Json<Vehicle>)> {
    let cmd = RegisterVehicleCommand {
        plate_number: req.plate_number,
        condition: req.condition,
        current_mileage: req.current_mileage,
        assigned_officer: req.assigned_officer.map(UserId::new).transpose()?,
    };

    let vehicle = handlers.register_handler.handle(cmd, caller.metadata()).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// PATCH /api/vehicles/:id/condition - Report a new condition
pub async fn update_vehicle_condition(
    State(handlers): State<VehicleHandlers>,
    caller: Caller,
    Path(vehicle_id): Path<String>,
    Json(req): Json<UpdateConditionRequest>,
) -> ApiResult<Json<Vehicle>> {
    let cmd = UpdateVehicleConditionCommand {
        vehicle_id: parse_id(&vehicle_id, "vehicle ID")?,
        condition: req.condition,
    };

    let vehicle = handlers.condition_handler.handle(cmd, caller.metadata()).await?;
    Ok(Json(vehicle))
}

/// GET /api/vehicle-requests?filter=mine|all
pub async fn list_vehicle_requests(
    State(handlers): State<VehicleHandlers>,
    caller: Caller,
    Query(query): Query<ListRequestsQuery>,
) -> ApiResult<Json<Vec<VehicleRequest>>> {
    let requests = handlers
        .queries
        .list_vehicle_requests(&caller.user_id, query.filter)
        .await?;
    Ok(Json(requests))
}

/// POST /api/vehicle-requests - Request a vehicle for the caller
pub async fn submit_vehicle_request(
    State(handlers): State<VehicleHandlers>,
    caller: Caller,
    Json(req): Json<SubmitRequestBody>,
) -> ApiResult<(StatusCode, Json<VehicleRequest>)> {
    let cmd = SubmitVehicleRequestCommand {
        vehicle_id: req.vehicle_id,
        destination: req.destination,
        reason: req.reason,
        start_mileage: req.start_mileage,
    };

    let request = handlers.submit_handler.handle(cmd, caller.metadata()).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// POST /api/vehicle-requests/:id/review - Approve, reject or complete
pub async fn review_vehicle_request(
    State(handlers): State<VehicleHandlers>,
    caller: Caller,
    Path(request_id): Path<String>,
    Json(req): Json<ReviewRequestBody>,
) -> ApiResult<Json<ReviewResponse>> {
    let cmd = ReviewVehicleRequestCommand {
        request_id: parse_id(&request_id, "vehicle request ID")?,
        action: req.action,
        end_mileage: req.end_mileage,
    };

    let result = handlers.review_handler.handle(cmd, caller.metadata()).await?;
    Ok(Json(result.into()))
}
