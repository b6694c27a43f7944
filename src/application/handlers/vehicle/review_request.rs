//! ReviewVehicleRequestHandler - approve, reject or complete a request.
//!
//! A review touches two aggregates. The request transition is committed
//! first with a compare-and-set on its prior status. The vehicle is then
//! re-derived inside the store's critical section against the current set
//! of approved requests and, if anything moved, published in the same
//! envelope as its condition.

use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::application::handlers::Notifier;
use crate::domain::foundation::{CommandMetadata, DomainError, ErrorCode, Timestamp, VehicleRequestId};
use crate::domain::sync::ChangeAction;
use crate::domain::vehicle::{RequestAction, Vehicle, VehicleRequest};
use crate::ports::VehicleRepository;

/// Command to move a request through its lifecycle.
#[derive(Debug, Clone)]
pub struct ReviewVehicleRequestCommand {
    pub request_id: VehicleRequestId,
    pub action: RequestAction,
    /// Required for [`RequestAction::Complete`].
    pub end_mileage: Option<u64>,
}

/// Result of a successful review.
#[derive(Debug, Clone)]
pub struct ReviewVehicleRequestResult {
    pub request: VehicleRequest,
    /// The vehicle after re-derivation, when it changed.
    pub vehicle: Option<Vehicle>,
}

/// Handler for reviewing vehicle requests.
pub struct ReviewVehicleRequestHandler {
    repository: Arc<dyn VehicleRepository>,
    publisher: Arc<ChangePublisher>,
    notifier: Arc<Notifier>,
}

impl ReviewVehicleRequestHandler {
    pub fn new(
        repository: Arc<dyn VehicleRepository>,
        publisher: Arc<ChangePublisher>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            repository,
            publisher,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReviewVehicleRequestCommand,
        metadata: CommandMetadata,
    ) -> Result<ReviewVehicleRequestResult, DomainError> {
        let now = self.publisher.clock().now();

        // 1. Load
        let mut request = self
            .repository
            .find_request(&cmd.request_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::VehicleRequestNotFound,
                    format!("Vehicle request {} not found", cmd.request_id),
                )
            })?;
        let expected = request.status();

        // 2. Transition (rejected transitions never reach the hub)
        request.apply(cmd.action, cmd.end_mileage, now)?;

        // 3. Conditional write
        self.repository
            .update_request_if_status(&request, expected)
            .await?;

        self.publisher
            .on_commit(
                Committed::VehicleRequest(request.clone()),
                ChangeAction::StatusChange,
                &metadata,
            )
            .await;

        tracing::info!(
            request_id = %request.id(),
            from = %expected,
            to = %request.status(),
            "Vehicle request reviewed"
        );

        // 4. Vehicle follows the request
        let vehicle = match self.sync_vehicle(&request, &metadata, now).await {
            Ok(vehicle) => vehicle,
            Err(e) => {
                tracing::warn!(
                    vehicle_id = %request.vehicle_id(),
                    "Failed to update vehicle after review: {}",
                    e
                );
                None
            }
        };

        // 5. Tell the requester
        let message = format!(
            "Your request for {} was {}",
            request.destination(),
            past_tense(cmd.action)
        );
        self.notifier
            .notify_all([request.requester()], &message, &metadata)
            .await;

        Ok(ReviewVehicleRequestResult { request, vehicle })
    }

    async fn sync_vehicle(
        &self,
        request: &VehicleRequest,
        metadata: &CommandMetadata,
        now: Timestamp,
    ) -> Result<Option<Vehicle>, DomainError> {
        let end_mileage = request.end_mileage();
        let update = self
            .repository
            .update_vehicle_with(
                request.vehicle_id(),
                Box::new(move |vehicle, has_active| {
                    let mut changed = false;
                    if let Some(end) = end_mileage {
                        match vehicle.record_mileage(end, now) {
                            Ok(()) => changed = true,
                            Err(e) => {
                                tracing::warn!(
                                    vehicle_id = %vehicle.id(),
                                    "Odometer not advanced: {}",
                                    e
                                );
                            }
                        }
                    }
                    vehicle.rederive_status(has_active, now) || changed
                }),
            )
            .await;

        let update = match update {
            Ok(update) => update,
            Err(e) if e.code == ErrorCode::VehicleNotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if !update.changed {
            return Ok(None);
        }

        self.publisher
            .on_commit(
                Committed::Vehicle {
                    vehicle: update.vehicle.clone(),
                    has_active_approved_request: update.has_active_approved_request,
                },
                ChangeAction::StatusChange,
                metadata,
            )
            .await;
        Ok(Some(update.vehicle))
    }
}

fn past_tense(action: RequestAction) -> &'static str {
    match action {
        RequestAction::Approve => "approved",
        RequestAction::Reject => "rejected",
        RequestAction::Complete => "marked completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Harness;
    use crate::domain::foundation::{UserId, VehicleId};
    use crate::domain::sync::EntityKind;
    use crate::domain::vehicle::{VehicleCondition, VehicleRequestStatus, VehicleStatus};
    use crate::ports::VehicleRepository;

    async fn seeded(h: &Harness) -> (Vehicle, VehicleRequest) {
        let vehicle = Vehicle::new(
            VehicleId::new(),
            "SAB-42",
            VehicleCondition::Good,
            1_000,
            None,
            Timestamp::from_unix_secs(0),
        )
        .unwrap();
        h.vehicles.save_vehicle(&vehicle).await.unwrap();

        let request = VehicleRequest::new(
            VehicleRequestId::new(),
            *vehicle.id(),
            UserId::new("o-1").unwrap(),
            1_000,
            "Purok 5",
            "Flood watch",
            Timestamp::from_unix_secs(0),
        )
        .unwrap();
        h.vehicles.insert_request_if_free(&request).await.unwrap();
        (vehicle, request)
    }

    fn handler(h: &Harness) -> ReviewVehicleRequestHandler {
        ReviewVehicleRequestHandler::new(h.vehicles.clone(), h.publisher.clone(), h.notifier.clone())
    }

    fn review(id: VehicleRequestId, action: RequestAction, end: Option<u64>) -> ReviewVehicleRequestCommand {
        ReviewVehicleRequestCommand {
            request_id: id,
            action,
            end_mileage: end,
        }
    }

    #[tokio::test]
    async fn approval_puts_vehicle_in_use_and_notifies() {
        let h = Harness::at(100);
        let (_, request) = seeded(&h).await;

        let result = handler(&h)
            .handle(
                review(*request.id(), RequestAction::Approve, None),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert_eq!(result.request.status(), VehicleRequestStatus::Approved);
        assert_eq!(result.vehicle.unwrap().status(), VehicleStatus::InUse);
        assert_eq!(h.broadcaster.of_kind(EntityKind::Vehicle).len(), 1);
        assert_eq!(h.broadcaster.of_kind(EntityKind::Notification).len(), 1);
    }

    #[tokio::test]
    async fn completion_frees_vehicle_and_advances_odometer() {
        let h = Harness::at(100);
        let (vehicle, request) = seeded(&h).await;
        let handler = handler(&h);

        handler
            .handle(
                review(*request.id(), RequestAction::Approve, None),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();
        let result = handler
            .handle(
                review(*request.id(), RequestAction::Complete, Some(1_080)),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert_eq!(result.request.status(), VehicleRequestStatus::Completed);
        let stored = h.vehicles.find_vehicle(vehicle.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), VehicleStatus::Available);
        assert_eq!(stored.current_mileage(), 1_080);
    }

    #[tokio::test]
    async fn rejection_leaves_vehicle_alone() {
        let h = Harness::at(100);
        let (_, request) = seeded(&h).await;

        let result = handler(&h)
            .handle(
                review(*request.id(), RequestAction::Reject, None),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert_eq!(result.request.status(), VehicleRequestStatus::Rejected);
        assert!(result.vehicle.is_none());
        assert!(h.broadcaster.of_kind(EntityKind::Vehicle).is_empty());
    }

    #[tokio::test]
    async fn illegal_transition_is_not_published() {
        let h = Harness::at(100);
        let (_, request) = seeded(&h).await;

        let err = handler(&h)
            .handle(
                review(*request.id(), RequestAction::Complete, Some(1_100)),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::IllegalTransition);
        assert!(h.broadcaster.published().is_empty());
        let stored = h.vehicles.find_request(request.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), VehicleRequestStatus::Pending);
    }

    #[tokio::test]
    async fn completing_without_mileage_is_rejected() {
        let h = Harness::at(100);
        let (_, request) = seeded(&h).await;
        let handler = handler(&h);
        handler
            .handle(
                review(*request.id(), RequestAction::Approve, None),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        let err = handler
            .handle(
                review(*request.id(), RequestAction::Complete, None),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn completion_keeps_a_condition_recorded_mid_trip() {
        use crate::application::handlers::vehicle::{
            UpdateVehicleConditionCommand, UpdateVehicleConditionHandler,
        };

        let h = Harness::at(100);
        let (vehicle, request) = seeded(&h).await;
        let handler = handler(&h);
        handler
            .handle(
                review(*request.id(), RequestAction::Approve, None),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        UpdateVehicleConditionHandler::new(h.vehicles.clone(), h.publisher.clone())
            .handle(
                UpdateVehicleConditionCommand {
                    vehicle_id: *vehicle.id(),
                    condition: VehicleCondition::NeedsMajor,
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        let result = handler
            .handle(
                review(*request.id(), RequestAction::Complete, Some(1_050)),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        let vehicle = result.vehicle.unwrap();
        assert_eq!(vehicle.condition(), VehicleCondition::NeedsMajor);
        assert_eq!(vehicle.status(), VehicleStatus::UnderMaintenance);
        assert_eq!(vehicle.current_mileage(), 1_050);
    }
}
