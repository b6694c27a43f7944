//! RegisterVehicleHandler - Command handler for adding a vehicle to the fleet.

use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::domain::foundation::{CommandMetadata, DomainError, UserId, VehicleId};
use crate::domain::sync::ChangeAction;
use crate::domain::vehicle::{Vehicle, VehicleCondition};
use crate::ports::VehicleRepository;

/// Command to register a vehicle.
#[derive(Debug, Clone)]
pub struct RegisterVehicleCommand {
    pub plate_number: String,
    pub condition: VehicleCondition,
    pub current_mileage: u64,
    pub assigned_officer: Option<UserId>,
}

/// Handler for registering vehicles.
pub struct RegisterVehicleHandler {
    repository: Arc<dyn VehicleRepository>,
    publisher: Arc<ChangePublisher>,
}

impl RegisterVehicleHandler {
    pub fn new(repository: Arc<dyn VehicleRepository>, publisher: Arc<ChangePublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: RegisterVehicleCommand,
        metadata: CommandMetadata,
    ) -> Result<Vehicle, DomainError> {
        let now = self.publisher.clock().now();
        let vehicle = Vehicle::new(
            VehicleId::new(),
            cmd.plate_number,
            cmd.condition,
            cmd.current_mileage,
            cmd.assigned_officer,
            now,
        )?;

        self.repository.save_vehicle(&vehicle).await?;

        self.publisher
            .on_commit(
                Committed::Vehicle {
                    vehicle: vehicle.clone(),
                    has_active_approved_request: false,
                },
                ChangeAction::Insert,
                &metadata,
            )
            .await;

        tracing::info!(vehicle_id = %vehicle.id(), plate = vehicle.plate_number(), "Vehicle registered");
        Ok(vehicle)
    }
}
