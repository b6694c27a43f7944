//! Vehicle and vehicle request repository port.
//!
//! The "at most one active request per vehicle" rule must hold even when
//! two officers submit at the same instant, so it is enforced here with a
//! single check-and-write rather than by callers reading first.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId, VehicleId, VehicleRequestId};
use crate::domain::vehicle::{Vehicle, VehicleRequest, VehicleRequestStatus, VehicleStatus};

/// Edit applied to a vehicle inside the store's critical section.
///
/// Receives the vehicle and whether an Approved request holds it, both read
/// under the same lock as the write. Returns true if it changed anything.
pub type VehicleChange = Box<dyn FnOnce(&mut Vehicle, bool) -> bool + Send>;

/// Result of [`VehicleRepository::update_vehicle_with`].
#[derive(Debug, Clone)]
pub struct VehicleUpdate {
    /// The vehicle as stored after the call.
    pub vehicle: Vehicle,
    pub previous_status: VehicleStatus,
    /// The active-approved fact the change was computed against.
    pub has_active_approved_request: bool,
    pub changed: bool,
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────
    // Vehicles
    // ─────────────────────────────────────────────────────────────────────

    /// Inserts or replaces a vehicle record.
    async fn save_vehicle(&self, vehicle: &Vehicle) -> Result<(), DomainError>;

    async fn find_vehicle(&self, id: &VehicleId) -> Result<Option<Vehicle>, DomainError>;

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, DomainError>;

    /// True if an Approved request currently holds the vehicle.
    async fn has_active_approved_request(&self, id: &VehicleId) -> Result<bool, DomainError>;

    /// Reads the vehicle and its active-approved fact, applies `change` and
    /// writes the result back, all without releasing the store.
    ///
    /// Request writes for the same vehicle cannot land between the read and
    /// the write, so a derived status never reflects a stale request table.
    ///
    /// # Errors
    ///
    /// - `VehicleNotFound` if the vehicle does not exist
    async fn update_vehicle_with(
        &self,
        id: &VehicleId,
        change: VehicleChange,
    ) -> Result<VehicleUpdate, DomainError>;

    // ─────────────────────────────────────────────────────────────────────
    // Requests
    // ─────────────────────────────────────────────────────────────────────

    async fn find_request(
        &self,
        id: &VehicleRequestId,
    ) -> Result<Option<VehicleRequest>, DomainError>;

    /// All requests, newest first.
    async fn list_requests(&self) -> Result<Vec<VehicleRequest>, DomainError>;

    /// Requests filed by `requester`, newest first.
    async fn list_requests_by(&self, requester: &UserId)
        -> Result<Vec<VehicleRequest>, DomainError>;

    /// Inserts a request only if its vehicle has no Pending or Approved one.
    ///
    /// # Errors
    ///
    /// - `VehicleNotFound` if the vehicle does not exist
    /// - `ConflictingReservation` if the vehicle is already held
    async fn insert_request_if_free(&self, request: &VehicleRequest) -> Result<(), DomainError>;

    /// Replaces a request only if its stored status still equals `expected`.
    ///
    /// When `request` is Approved the write is also refused if another
    /// request for the same vehicle is Approved.
    ///
    /// # Errors
    ///
    /// - `VehicleRequestNotFound` if the request is gone
    /// - `StaleWrite` if the stored status moved on
    /// - `ConflictingReservation` if approval would double-book the vehicle
    async fn update_request_if_status(
        &self,
        request: &VehicleRequest,
        expected: VehicleRequestStatus,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn VehicleRepository) {}
    }
}
