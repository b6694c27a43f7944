//! In-memory vehicle and vehicle request store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, UserId, VehicleId, VehicleRequestId};
use crate::domain::vehicle::{Vehicle, VehicleRequest, VehicleRequestStatus};
use crate::ports::{VehicleChange, VehicleRepository, VehicleUpdate};

#[derive(Default)]
struct Tables {
    vehicles: HashMap<VehicleId, Vehicle>,
    requests: HashMap<VehicleRequestId, VehicleRequest>,
}

impl Tables {
    fn is_held(&self, vehicle_id: &VehicleId) -> bool {
        self.requests
            .values()
            .any(|r| r.vehicle_id() == vehicle_id && r.is_active_approved())
    }

    fn active_request_for(&self, vehicle_id: &VehicleId) -> Option<&VehicleRequest> {
        self.requests
            .values()
            .find(|r| r.vehicle_id() == vehicle_id && r.is_active())
    }
}

/// Vehicle repository holding both tables behind one mutex.
///
/// Vehicles and requests share the lock so the one-active-request check
/// and the insert it guards are a single critical section.
#[derive(Default)]
pub struct InMemoryVehicleStore {
    tables: Mutex<Tables>,
}

impl InMemoryVehicleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut requests: Vec<VehicleRequest>) -> Vec<VehicleRequest> {
    requests.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(a.id().cmp(b.id())));
    requests
}

#[async_trait]
impl VehicleRepository for InMemoryVehicleStore {
    async fn save_vehicle(&self, vehicle: &Vehicle) -> Result<(), DomainError> {
        self.tables
            .lock()
            .await
            .vehicles
            .insert(*vehicle.id(), vehicle.clone());
        Ok(())
    }

    async fn find_vehicle(&self, id: &VehicleId) -> Result<Option<Vehicle>, DomainError> {
        Ok(self.tables.lock().await.vehicles.get(id).cloned())
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, DomainError> {
        let mut vehicles: Vec<Vehicle> =
            self.tables.lock().await.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.plate_number().cmp(b.plate_number()));
        Ok(vehicles)
    }

    async fn has_active_approved_request(&self, id: &VehicleId) -> Result<bool, DomainError> {
        Ok(self.tables.lock().await.is_held(id))
    }

    async fn update_vehicle_with(
        &self,
        id: &VehicleId,
        change: VehicleChange,
    ) -> Result<VehicleUpdate, DomainError> {
        let mut tables = self.tables.lock().await;
        let has_active_approved_request = tables.is_held(id);

        let stored = tables.vehicles.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::VehicleNotFound, format!("Vehicle {} not found", id))
        })?;
        let previous_status = stored.status();

        let mut next = stored.clone();
        let changed = change(&mut next, has_active_approved_request);
        if changed {
            *stored = next.clone();
        } else {
            next = stored.clone();
        }

        Ok(VehicleUpdate {
            vehicle: next,
            previous_status,
            has_active_approved_request,
            changed,
        })
    }

    async fn find_request(
        &self,
        id: &VehicleRequestId,
    ) -> Result<Option<VehicleRequest>, DomainError> {
        Ok(self.tables.lock().await.requests.get(id).cloned())
    }

    async fn list_requests(&self) -> Result<Vec<VehicleRequest>, DomainError> {
        Ok(newest_first(
            self.tables.lock().await.requests.values().cloned().collect(),
        ))
    }

    async fn list_requests_by(
        &self,
        requester: &UserId,
    ) -> Result<Vec<VehicleRequest>, DomainError> {
        Ok(newest_first(
            self.tables
                .lock()
                .await
                .requests
                .values()
                .filter(|r| r.requester() == requester)
                .cloned()
                .collect(),
        ))
    }

    async fn insert_request_if_free(&self, request: &VehicleRequest) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;

        if !tables.vehicles.contains_key(request.vehicle_id()) {
            return Err(DomainError::new(
                ErrorCode::VehicleNotFound,
                format!("Vehicle {} not found", request.vehicle_id()),
            ));
        }
        if let Some(existing) = tables.active_request_for(request.vehicle_id()) {
            return Err(DomainError::conflicting_reservation(format!(
                "Vehicle {} already has a {} request",
                request.vehicle_id(),
                existing.status()
            ))
            .with_detail("existing_request_id", existing.id().to_string()));
        }

        tables.requests.insert(*request.id(), request.clone());
        Ok(())
    }

    async fn update_request_if_status(
        &self,
        request: &VehicleRequest,
        expected: VehicleRequestStatus,
    ) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;

        let stored = tables.requests.get(request.id()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::VehicleRequestNotFound,
                format!("Vehicle request {} not found", request.id()),
            )
        })?;
        if stored.status() != expected {
            return Err(DomainError::stale_write(format!(
                "Vehicle request {} is now {}",
                request.id(),
                stored.status()
            ))
            .with_detail("status", stored.status().to_string()));
        }

        if request.status() == VehicleRequestStatus::Approved {
            let double_booked = tables.requests.values().any(|r| {
                r.id() != request.id()
                    && r.vehicle_id() == request.vehicle_id()
                    && r.is_active_approved()
            });
            if double_booked {
                return Err(DomainError::conflicting_reservation(format!(
                    "Vehicle {} is already in use",
                    request.vehicle_id()
                )));
            }
        }

        tables.requests.insert(*request.id(), request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::vehicle::{VehicleCondition, VehicleStatus};
    use std::sync::Arc;

    async fn store_with_vehicle() -> (InMemoryVehicleStore, VehicleId) {
        let store = InMemoryVehicleStore::new();
        let vehicle = Vehicle::new(
            VehicleId::new(),
            "SAB-1",
            VehicleCondition::Good,
            1_000,
            None,
            Timestamp::from_unix_secs(0),
        )
        .unwrap();
        let id = *vehicle.id();
        store.save_vehicle(&vehicle).await.unwrap();
        (store, id)
    }

    fn request(vehicle_id: VehicleId, who: &str) -> VehicleRequest {
        VehicleRequest::new(
            VehicleRequestId::new(),
            vehicle_id,
            UserId::new(who).unwrap(),
            1_000,
            "Purok 2",
            "Patrol",
            Timestamp::from_unix_secs(1),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn second_active_request_conflicts() {
        let (store, vehicle_id) = store_with_vehicle().await;
        store
            .insert_request_if_free(&request(vehicle_id, "o-1"))
            .await
            .unwrap();

        let err = store
            .insert_request_if_free(&request(vehicle_id, "o-2"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConflictingReservation);
    }

    #[tokio::test]
    async fn request_for_unknown_vehicle_is_not_found() {
        let (store, _) = store_with_vehicle().await;
        let err = store
            .insert_request_if_free(&request(VehicleId::new(), "o-1"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VehicleNotFound);
    }

    #[tokio::test]
    async fn concurrent_submissions_admit_exactly_one() {
        let (store, vehicle_id) = store_with_vehicle().await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert_request_if_free(&request(vehicle_id, &format!("o-{}", i)))
                    .await
                    .is_ok()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn status_compare_and_set_detects_stale_writes() {
        let (store, vehicle_id) = store_with_vehicle().await;
        let original = request(vehicle_id, "o-1");
        store.insert_request_if_free(&original).await.unwrap();

        let mut approved = original.clone();
        approved.approve(Timestamp::from_unix_secs(2)).unwrap();
        store
            .update_request_if_status(&approved, VehicleRequestStatus::Pending)
            .await
            .unwrap();

        let mut rejected = original.clone();
        rejected.reject(Timestamp::from_unix_secs(3)).unwrap();
        let err = store
            .update_request_if_status(&rejected, VehicleRequestStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StaleWrite);
        assert!(store.has_active_approved_request(&vehicle_id).await.unwrap());
    }

    #[tokio::test]
    async fn update_with_sees_the_approved_request_under_the_same_lock() {
        let (store, vehicle_id) = store_with_vehicle().await;
        let original = request(vehicle_id, "o-1");
        store.insert_request_if_free(&original).await.unwrap();
        let mut approved = original.clone();
        approved.approve(Timestamp::from_unix_secs(2)).unwrap();
        store
            .update_request_if_status(&approved, VehicleRequestStatus::Pending)
            .await
            .unwrap();

        let update = store
            .update_vehicle_with(
                &vehicle_id,
                Box::new(|vehicle, has_active| {
                    vehicle.update_condition(
                        VehicleCondition::NeedsMajor,
                        has_active,
                        Timestamp::from_unix_secs(3),
                    );
                    true
                }),
            )
            .await
            .unwrap();

        assert!(update.changed);
        assert!(update.has_active_approved_request);
        assert_eq!(update.previous_status, VehicleStatus::Available);
        let stored = store.find_vehicle(&vehicle_id).await.unwrap().unwrap();
        assert_eq!(stored.condition(), VehicleCondition::NeedsMajor);
        assert_eq!(stored.status(), VehicleStatus::InUse);
    }

    #[tokio::test]
    async fn unchanged_update_leaves_the_record_alone() {
        let (store, vehicle_id) = store_with_vehicle().await;
        let before = store.find_vehicle(&vehicle_id).await.unwrap().unwrap();

        let update = store
            .update_vehicle_with(
                &vehicle_id,
                Box::new(|vehicle, _| {
                    vehicle.assign_officer(None, Timestamp::from_unix_secs(9));
                    false
                }),
            )
            .await
            .unwrap();

        assert!(!update.changed);
        assert_eq!(update.vehicle, before);
        assert_eq!(store.find_vehicle(&vehicle_id).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn update_with_unknown_vehicle_is_not_found() {
        let (store, _) = store_with_vehicle().await;
        let err = store
            .update_vehicle_with(&VehicleId::new(), Box::new(|_, _| true))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VehicleNotFound);
    }
}
