//! Vehicle request entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, StateMachine, Timestamp, TransitionError, UserId, ValidationError, VehicleId,
    VehicleRequestId,
};

use super::request_status::VehicleRequestStatus;

/// Action an administrator or officer takes on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    Approve,
    Reject,
    Complete,
}

impl RequestAction {
    /// The status this action moves a request into.
    pub fn target(&self) -> VehicleRequestStatus {
        match self {
            RequestAction::Approve => VehicleRequestStatus::Approved,
            RequestAction::Reject => VehicleRequestStatus::Rejected,
            RequestAction::Complete => VehicleRequestStatus::Completed,
        }
    }
}

/// Validates `action` against the request transition table.
pub fn validate_transition(
    current: VehicleRequestStatus,
    action: RequestAction,
) -> Result<VehicleRequestStatus, TransitionError> {
    current.transition_to(action.target())
}

/// A request by an officer to take out a vehicle.
///
/// # Invariants
///
/// - `status` only moves along the table in [`VehicleRequestStatus`]
/// - `end_mileage` is set exactly when Completed, and exceeds `start_mileage`
/// - a rejected mutation leaves the request untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRequest {
    id: VehicleRequestId,
    vehicle_id: VehicleId,
    requester: UserId,
    start_mileage: u64,
    end_mileage: Option<u64>,
    destination: String,
    reason: String,
    status: VehicleRequestStatus,
    approved_at: Option<Timestamp>,
    rejected_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl VehicleRequest {
    /// Creates a Pending request.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if destination or reason is blank
    pub fn new(
        id: VehicleRequestId,
        vehicle_id: VehicleId,
        requester: UserId,
        start_mileage: u64,
        destination: impl Into<String>,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let destination = destination.into();
        let reason = reason.into();
        if destination.trim().is_empty() {
            return Err(ValidationError::empty_field("destination").into());
        }
        if reason.trim().is_empty() {
            return Err(ValidationError::empty_field("reason").into());
        }

        Ok(Self {
            id,
            vehicle_id,
            requester,
            start_mileage,
            end_mileage: None,
            destination,
            reason,
            status: VehicleRequestStatus::Pending,
            approved_at: None,
            rejected_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &VehicleRequestId {
        &self.id
    }

    pub fn vehicle_id(&self) -> &VehicleId {
        &self.vehicle_id
    }

    pub fn requester(&self) -> &UserId {
        &self.requester
    }

    pub fn start_mileage(&self) -> u64 {
        self.start_mileage
    }

    pub fn end_mileage(&self) -> Option<u64> {
        self.end_mileage
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn status(&self) -> VehicleRequestStatus {
        self.status
    }

    pub fn approved_at(&self) -> Option<Timestamp> {
        self.approved_at
    }

    pub fn rejected_at(&self) -> Option<Timestamp> {
        self.rejected_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// True while the request still holds its vehicle.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// True when the vehicle is out on this request.
    pub fn is_active_approved(&self) -> bool {
        self.status == VehicleRequestStatus::Approved
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn approve(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.status = validate_transition(self.status, RequestAction::Approve)?;
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.status = validate_transition(self.status, RequestAction::Reject)?;
        self.rejected_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Closes an approved trip.
    ///
    /// # Errors
    ///
    /// - `IllegalTransition` unless Approved
    /// - `ValidationFailed` unless `end_mileage > start_mileage`
    pub fn complete(&mut self, end_mileage: u64, now: Timestamp) -> Result<(), DomainError> {
        let next = validate_transition(self.status, RequestAction::Complete)?;
        if end_mileage <= self.start_mileage {
            return Err(DomainError::validation(
                "end_mileage",
                format!(
                    "End mileage {} must exceed start mileage {}",
                    end_mileage, self.start_mileage
                ),
            ));
        }
        self.status = next;
        self.end_mileage = Some(end_mileage);
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Applies `action`, dispatching to the matching transition.
    ///
    /// `end_mileage` is only read for [`RequestAction::Complete`].
    pub fn apply(
        &mut self,
        action: RequestAction,
        end_mileage: Option<u64>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        match action {
            RequestAction::Approve => self.approve(now),
            RequestAction::Reject => self.reject(now),
            RequestAction::Complete => {
                let end = end_mileage
                    .ok_or_else(|| DomainError::validation("end_mileage", "End mileage is required"))?;
                self.complete(end, now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;
    use proptest::prelude::*;

    fn pending() -> VehicleRequest {
        VehicleRequest::new(
            VehicleRequestId::new(),
            VehicleId::new(),
            UserId::new("officer-1").unwrap(),
            1_000,
            "Purok 4",
            "Night patrol",
            Timestamp::from_unix_secs(100),
        )
        .unwrap()
    }

    #[test]
    fn new_request_is_pending() {
        let request = pending();
        assert_eq!(request.status(), VehicleRequestStatus::Pending);
        assert!(request.is_active());
        assert_eq!(request.end_mileage(), None);
    }

    #[test]
    fn blank_destination_is_rejected() {
        let result = VehicleRequest::new(
            VehicleRequestId::new(),
            VehicleId::new(),
            UserId::new("officer-1").unwrap(),
            0,
            " ",
            "reason",
            Timestamp::now(),
        );
        assert_eq!(result.unwrap_err().code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn approve_then_complete_records_timestamps() {
        let mut request = pending();
        request.approve(Timestamp::from_unix_secs(200)).unwrap();
        assert!(request.is_active_approved());

        request.complete(1_050, Timestamp::from_unix_secs(300)).unwrap();
        assert_eq!(request.status(), VehicleRequestStatus::Completed);
        assert_eq!(request.end_mileage(), Some(1_050));
        assert_eq!(request.approved_at(), Some(Timestamp::from_unix_secs(200)));
        assert_eq!(request.completed_at(), Some(Timestamp::from_unix_secs(300)));
    }

    #[test]
    fn complete_requires_higher_end_mileage() {
        let mut request = pending();
        request.approve(Timestamp::from_unix_secs(200)).unwrap();
        let before = request.clone();

        let err = request.complete(1_000, Timestamp::from_unix_secs(300)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(request, before);
    }

    #[test]
    fn completing_pending_request_is_illegal() {
        let mut request = pending();
        let err = request.complete(2_000, Timestamp::now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::IllegalTransition);
    }

    #[test]
    fn rejected_request_cannot_be_approved() {
        let mut request = pending();
        request.reject(Timestamp::from_unix_secs(150)).unwrap();
        let before = request.clone();

        let err = request.approve(Timestamp::from_unix_secs(160)).unwrap_err();
        assert_eq!(err.code, ErrorCode::IllegalTransition);
        assert_eq!(request, before);
    }

    #[test]
    fn apply_complete_without_mileage_fails() {
        let mut request = pending();
        request.approve(Timestamp::now()).unwrap();
        assert!(request.apply(RequestAction::Complete, None, Timestamp::now()).is_err());
    }

    fn any_action() -> impl Strategy<Value = RequestAction> {
        prop::sample::select(vec![
            RequestAction::Approve,
            RequestAction::Reject,
            RequestAction::Complete,
        ])
    }

    proptest! {
        #[test]
        fn failed_actions_leave_request_unchanged(actions in prop::collection::vec(any_action(), 1..8)) {
            let mut request = pending();
            for (i, action) in actions.into_iter().enumerate() {
                let before = request.clone();
                let legal = validate_transition(request.status(), action).is_ok();
                let result = request.apply(action, Some(5_000), Timestamp::from_unix_secs(1_000 + i as i64));
                prop_assert_eq!(result.is_ok(), legal);
                if !legal {
                    prop_assert_eq!(&request, &before);
                }
            }
        }
    }
}
