//! Vehicle aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp, UserId, ValidationError, VehicleId};

use super::condition::{derive_status, VehicleCondition, VehicleStatus};

/// A patrol vehicle.
///
/// `status` is never assigned directly. Every mutation that can affect it
/// takes the current "has an approved, uncompleted request" fact and runs
/// [`derive_status`] so condition and status always change together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    id: VehicleId,
    plate_number: String,
    condition: VehicleCondition,
    status: VehicleStatus,
    current_mileage: u64,
    assigned_officer: Option<UserId>,
    updated_at: Timestamp,
}

impl Vehicle {
    /// Registers a vehicle with no active request.
    pub fn new(
        id: VehicleId,
        plate_number: impl Into<String>,
        condition: VehicleCondition,
        current_mileage: u64,
        assigned_officer: Option<UserId>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let plate_number = plate_number.into();
        if plate_number.trim().is_empty() {
            return Err(ValidationError::empty_field("plate_number").into());
        }
        Ok(Self {
            id,
            plate_number,
            condition,
            status: derive_status(condition, false),
            current_mileage,
            assigned_officer,
            updated_at: now,
        })
    }

    pub fn id(&self) -> &VehicleId {
        &self.id
    }

    pub fn plate_number(&self) -> &str {
        &self.plate_number
    }

    pub fn condition(&self) -> VehicleCondition {
        self.condition
    }

    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    pub fn current_mileage(&self) -> u64 {
        self.current_mileage
    }

    pub fn assigned_officer(&self) -> Option<&UserId> {
        self.assigned_officer.as_ref()
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Recomputes status from condition and the active-request fact.
    ///
    /// Returns true if the status changed. Bumps `updated_at` only then.
    pub fn rederive_status(&mut self, has_active_approved_request: bool, now: Timestamp) -> bool {
        let next = derive_status(self.condition, has_active_approved_request);
        if next == self.status {
            return false;
        }
        self.status = next;
        self.updated_at = now;
        true
    }

    /// Recomputes the cached status at a read or publish point.
    ///
    /// Unlike [`Vehicle::rederive_status`] this never touches `updated_at`.
    pub fn refresh_status(&mut self, has_active_approved_request: bool) -> VehicleStatus {
        self.status = derive_status(self.condition, has_active_approved_request);
        self.status
    }

    /// Records a new condition and re-derives status in the same step.
    pub fn update_condition(
        &mut self,
        condition: VehicleCondition,
        has_active_approved_request: bool,
        now: Timestamp,
    ) {
        self.condition = condition;
        self.status = derive_status(condition, has_active_approved_request);
        self.updated_at = now;
    }

    /// Advances the odometer at the end of a trip.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the reading would go backwards
    pub fn record_mileage(&mut self, mileage: u64, now: Timestamp) -> Result<(), DomainError> {
        if mileage < self.current_mileage {
            return Err(DomainError::validation(
                "current_mileage",
                format!(
                    "Mileage {} is below the recorded {}",
                    mileage, self.current_mileage
                ),
            ));
        }
        self.current_mileage = mileage;
        self.updated_at = now;
        Ok(())
    }

    pub fn assign_officer(&mut self, officer: Option<UserId>, now: Timestamp) {
        self.assigned_officer = officer;
        self.updated_at = now;
    }
}
