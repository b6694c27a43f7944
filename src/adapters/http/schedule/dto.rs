//! HTTP DTOs for schedule endpoints.
//!
//! Responses carry the domain `Schedule` unchanged so a pulled collection
//! and a pushed envelope describe an entity with the same shape.

use serde::Deserialize;

use crate::adapters::http::error::{ApiError, ApiResult};
use crate::application::handlers::UpdateScheduleCommand;
use crate::domain::foundation::{PatrolAreaId, ScheduleId, Timestamp, UserId};
use crate::domain::schedule::{RosterMember, ShiftKind};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub shift: ShiftKind,
    pub start: Timestamp,
    pub end: Timestamp,
    pub roster: Vec<RosterMember>,
    pub area: String,
}

/// Partial edit of a shift. Fields left out are not touched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    #[serde(default)]
    pub expected_updated_at: Option<Timestamp>,
    #[serde(default)]
    pub start: Option<Timestamp>,
    #[serde(default)]
    pub end: Option<Timestamp>,
    #[serde(default)]
    pub shift: Option<ShiftKind>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub add_members: Vec<String>,
    #[serde(default)]
    pub leader: Option<String>,
    #[serde(default)]
    pub remove_members: Vec<String>,
}

impl UpdateScheduleRequest {
    /// Builds the command. `start`/`end` and `shift`/`area` travel in pairs.
    pub fn into_command(self, schedule_id: ScheduleId) -> ApiResult<UpdateScheduleCommand> {
        let window = match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            (None, None) => None,
            _ => return Err(ApiError::bad_request("start and end must be given together")),
        };
        let reassignment = match (self.shift, self.area) {
            (Some(shift), Some(area)) => Some((shift, PatrolAreaId::new(area)?)),
            (None, None) => None,
            _ => return Err(ApiError::bad_request("shift and area must be given together")),
        };

        Ok(UpdateScheduleCommand {
            schedule_id,
            expected_updated_at: self.expected_updated_at,
            window,
            reassignment,
            add_members: parse_users(self.add_members)?,
            leader: self.leader.map(UserId::new).transpose()?,
            remove_members: parse_users(self.remove_members)?,
        })
    }
}

fn parse_users(raw: Vec<String>) -> ApiResult<Vec<UserId>> {
    raw.into_iter()
        .map(|id| UserId::new(id).map_err(ApiError::from))
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSchedulesQuery {
    /// Only shifts the caller is rostered on.
    #[serde(default)]
    pub mine: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_a_window_is_rejected() {
        let request = UpdateScheduleRequest {
            start: Some(Timestamp::from_unix_secs(10)),
            ..Default::default()
        };
        assert!(request.into_command(ScheduleId::new()).is_err());
    }

    #[test]
    fn roster_edits_are_parsed() {
        let request: UpdateScheduleRequest = serde_json::from_value(serde_json::json!({
            "addMembers": ["o-3"],
            "leader": "o-3",
            "removeMembers": ["o-1"]
        }))
        .unwrap();

        let command = request.into_command(ScheduleId::new()).unwrap();
        assert_eq!(command.add_members, vec![UserId::new("o-3").unwrap()]);
        assert_eq!(command.leader, Some(UserId::new("o-3").unwrap()));
        assert!(command.window.is_none());
    }
}
