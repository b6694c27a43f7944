//! UpdateVehicleConditionHandler - record a new mechanical condition.

use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::domain::foundation::{CommandMetadata, DomainError, VehicleId};
use crate::domain::sync::ChangeAction;
use crate::domain::vehicle::{Vehicle, VehicleCondition};
use crate::ports::VehicleRepository;

/// Command to change a vehicle's condition.
#[derive(Debug, Clone)]
pub struct UpdateVehicleConditionCommand {
    pub vehicle_id: VehicleId,
    pub condition: VehicleCondition,
}

/// Handler for condition updates. Status is re-derived in the same write.
pub struct UpdateVehicleConditionHandler {
    repository: Arc<dyn VehicleRepository>,
    publisher: Arc<ChangePublisher>,
}

impl UpdateVehicleConditionHandler {
    pub fn new(repository: Arc<dyn VehicleRepository>, publisher: Arc<ChangePublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateVehicleConditionCommand,
        metadata: CommandMetadata,
    ) -> Result<Vehicle, DomainError> {
        let now = self.publisher.clock().now();
        let condition = cmd.condition;

        let update = self
            .repository
            .update_vehicle_with(
                &cmd.vehicle_id,
                Box::new(move |vehicle, has_active| {
                    vehicle.update_condition(condition, has_active, now);
                    true
                }),
            )
            .await?;
        let vehicle = update.vehicle;

        let action = if vehicle.status() == update.previous_status {
            ChangeAction::Update
        } else {
            ChangeAction::StatusChange
        };
        self.publisher
            .on_commit(
                Committed::Vehicle {
                    vehicle: vehicle.clone(),
                    has_active_approved_request: update.has_active_approved_request,
                },
                action,
                &metadata,
            )
            .await;

        tracing::info!(
            vehicle_id = %vehicle.id(),
            condition = %vehicle.condition(),
            status = %vehicle.status(),
            "Vehicle condition updated"
        );
        Ok(vehicle)
    }
}
