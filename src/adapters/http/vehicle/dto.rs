//! HTTP DTOs for vehicle and vehicle request endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::ReviewVehicleRequestResult;
use crate::application::RequestFilter;
use crate::domain::foundation::VehicleId;
use crate::domain::vehicle::{RequestAction, Vehicle, VehicleCondition, VehicleRequest};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVehicleRequest {
    pub plate_number: String,
    pub condition: VehicleCondition,
    #[serde(default)]
    pub current_mileage: u64,
    #[serde(default)]
    pub assigned_officer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConditionRequest {
    pub condition: VehicleCondition,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestBody {
    pub vehicle_id: VehicleId,
    pub destination: String,
    pub reason: String,
    #[serde(default)]
    pub start_mileage: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestBody {
    pub action: RequestAction,
    #[serde(default)]
    pub end_mileage: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequestsQuery {
    #[serde(default)]
    pub filter: RequestFilter,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Outcome of a review: the request and, if it moved, the vehicle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub request: VehicleRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<Vehicle>,
}

impl From<ReviewVehicleRequestResult> for ReviewResponse {
    fn from(result: ReviewVehicleRequestResult) -> Self {
        Self {
            request: result.request,
            vehicle: result.vehicle,
        }
    }
}
