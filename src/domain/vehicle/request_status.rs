//! Vehicle request status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle of a vehicle usage request.
///
/// ```text
/// Pending ──► Approved ──► Completed
///    │
///    └──────► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleRequestStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl VehicleRequestStatus {
    pub const ALL: [VehicleRequestStatus; 4] = [
        VehicleRequestStatus::Pending,
        VehicleRequestStatus::Approved,
        VehicleRequestStatus::Rejected,
        VehicleRequestStatus::Completed,
    ];

    /// Pending and Approved requests hold the vehicle.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            VehicleRequestStatus::Pending | VehicleRequestStatus::Approved
        )
    }

    /// Monotonic progress rank. Terminal states share the top rank.
    pub fn rank(&self) -> u8 {
        match self {
            VehicleRequestStatus::Pending => 0,
            VehicleRequestStatus::Approved => 1,
            VehicleRequestStatus::Rejected | VehicleRequestStatus::Completed => 2,
        }
    }
}

impl StateMachine for VehicleRequestStatus {
    const ENTITY: &'static str = "VehicleRequest";

    fn can_transition_to(&self, target: &Self) -> bool {
        use VehicleRequestStatus::*;
        matches!(
            (self, target),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Completed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use VehicleRequestStatus::*;
        match self {
            Pending => vec![Approved, Rejected],
            Approved => vec![Completed],
            Rejected | Completed => vec![],
        }
    }
}

impl fmt::Display for VehicleRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VehicleRequestStatus::Pending => "Pending",
            VehicleRequestStatus::Approved => "Approved",
            VehicleRequestStatus::Rejected => "Rejected",
            VehicleRequestStatus::Completed => "Completed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use VehicleRequestStatus::*;

    fn any_status() -> impl Strategy<Value = VehicleRequestStatus> {
        prop::sample::select(VehicleRequestStatus::ALL.to_vec())
    }

    #[test]
    fn legal_transitions_succeed() {
        assert_eq!(Pending.transition_to(Approved), Ok(Approved));
        assert_eq!(Pending.transition_to(Rejected), Ok(Rejected));
        assert_eq!(Approved.transition_to(Completed), Ok(Completed));
    }

    #[test]
    fn pending_cannot_skip_to_completed() {
        let err = Pending.transition_to(Completed).unwrap_err();
        assert_eq!(err.entity, "VehicleRequest");
    }

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(Rejected.is_terminal());
        assert!(Completed.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Approved.is_terminal());
    }

    #[test]
    fn only_pending_and_approved_are_active() {
        assert!(Pending.is_active());
        assert!(Approved.is_active());
        assert!(!Rejected.is_active());
        assert!(!Completed.is_active());
    }

    #[test]
    fn rank_orders_terminal_above_approved_above_pending() {
        assert!(Pending.rank() < Approved.rank());
        assert!(Approved.rank() < Completed.rank());
        assert_eq!(Completed.rank(), Rejected.rank());
    }

    proptest! {
        #[test]
        fn only_the_three_table_transitions_are_legal(from in any_status(), to in any_status()) {
            let legal = matches!(
                (from, to),
                (Pending, Approved) | (Pending, Rejected) | (Approved, Completed)
            );
            prop_assert_eq!(from.transition_to(to).is_ok(), legal);
            prop_assert_eq!(from.valid_transitions().contains(&to), legal);
        }

        #[test]
        fn legal_transitions_never_lower_rank(from in any_status(), to in any_status()) {
            if from.can_transition_to(&to) {
                prop_assert!(to.rank() > from.rank());
            }
        }
    }
}
