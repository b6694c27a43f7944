//! Vehicle condition and the status derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mechanical condition reported for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCondition {
    Good,
    NeedsMinor,
    NeedsMajor,
    NotOperational,
}

impl VehicleCondition {
    pub const ALL: [VehicleCondition; 4] = [
        VehicleCondition::Good,
        VehicleCondition::NeedsMinor,
        VehicleCondition::NeedsMajor,
        VehicleCondition::NotOperational,
    ];
}

impl fmt::Display for VehicleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VehicleCondition::Good => "Good",
            VehicleCondition::NeedsMinor => "NeedsMinor",
            VehicleCondition::NeedsMajor => "NeedsMajor",
            VehicleCondition::NotOperational => "NotOperational",
        };
        write!(f, "{}", s)
    }
}

/// Availability of a vehicle. Always the output of [`derive_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InUse,
    UnderMaintenance,
    OutOfService,
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VehicleStatus::Available => "Available",
            VehicleStatus::InUse => "InUse",
            VehicleStatus::UnderMaintenance => "UnderMaintenance",
            VehicleStatus::OutOfService => "OutOfService",
        };
        write!(f, "{}", s)
    }
}

/// Derives a vehicle's status. Total over every input pair.
///
/// An approved, uncompleted request wins over condition: a vehicle out on
/// patrol is `InUse` even if its condition has since been downgraded.
pub fn derive_status(
    condition: VehicleCondition,
    has_active_approved_request: bool,
) -> VehicleStatus {
    if has_active_approved_request {
        return VehicleStatus::InUse;
    }
    match condition {
        VehicleCondition::Good => VehicleStatus::Available,
        VehicleCondition::NeedsMinor | VehicleCondition::NeedsMajor => {
            VehicleStatus::UnderMaintenance
        }
        VehicleCondition::NotOperational => VehicleStatus::OutOfService,
    }
}
