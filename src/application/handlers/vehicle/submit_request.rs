//! SubmitVehicleRequestHandler - Command handler for booking a vehicle.

use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::domain::foundation::{CommandMetadata, DomainError, ErrorCode, VehicleId, VehicleRequestId};
use crate::domain::sync::ChangeAction;
use crate::domain::vehicle::VehicleRequest;
use crate::ports::VehicleRepository;

/// Command to request a vehicle. The requester is the command's actor.
#[derive(Debug, Clone)]
pub struct SubmitVehicleRequestCommand {
    pub vehicle_id: VehicleId,
    pub destination: String,
    pub reason: String,
    /// Defaults to the vehicle's recorded odometer.
    pub start_mileage: Option<u64>,
}

/// Handler for submitting vehicle requests.
///
/// The one-active-request rule is enforced by the repository's conditional
/// insert, so two concurrent submissions for the same vehicle admit one.
pub struct SubmitVehicleRequestHandler {
    repository: Arc<dyn VehicleRepository>,
    publisher: Arc<ChangePublisher>,
}

impl SubmitVehicleRequestHandler {
    pub fn new(repository: Arc<dyn VehicleRepository>, publisher: Arc<ChangePublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: SubmitVehicleRequestCommand,
        metadata: CommandMetadata,
    ) -> Result<VehicleRequest, DomainError> {
        let now = self.publisher.clock().now();

        let vehicle = self
            .repository
            .find_vehicle(&cmd.vehicle_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::VehicleNotFound,
                    format!("Vehicle {} not found", cmd.vehicle_id),
                )
            })?;

        let request = VehicleRequest::new(
            VehicleRequestId::new(),
            cmd.vehicle_id,
            metadata.actor.clone(),
            cmd.start_mileage.unwrap_or(vehicle.current_mileage()),
            cmd.destination,
            cmd.reason,
            now,
        )?;

        if let Err(err) = self.repository.insert_request_if_free(&request).await {
            tracing::debug!(vehicle_id = %cmd.vehicle_id, code = %err.code, "Vehicle request refused");
            return Err(err);
        }

        self.publisher
            .on_commit(
                Committed::VehicleRequest(request.clone()),
                ChangeAction::Insert,
                &metadata,
            )
            .await;

        tracing::info!(
            request_id = %request.id(),
            vehicle_id = %request.vehicle_id(),
            requester = %request.requester(),
            "Vehicle request submitted"
        );
        Ok(request)
    }
}
