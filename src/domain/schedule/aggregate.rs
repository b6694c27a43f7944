//! Schedule aggregate - a single patrol shift.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, PatrolAreaId, ScheduleId, Timestamp, UserId};

use super::roster::{Roster, RosterMember};
use super::status::{compute_status, ScheduleStatus, ShiftKind};

/// A scheduled patrol shift.
///
/// # Invariants
///
/// - `end` is strictly after `start`
/// - `status` is a cache of `compute_status(now, start, end)`; it is
///   refreshed at every read and before every publish
/// - time fields and roster are mutable only while `Upcoming`
/// - a shift is never deleted while `Ongoing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    id: ScheduleId,
    shift: ShiftKind,
    start: Timestamp,
    end: Timestamp,
    roster: Roster,
    area: PatrolAreaId,
    status: ScheduleStatus,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Schedule {
    /// Creates a new shift as of `now`.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the window is empty or inverted
    pub fn new(
        id: ScheduleId,
        shift: ShiftKind,
        start: Timestamp,
        end: Timestamp,
        roster: Roster,
        area: PatrolAreaId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        Self::validate_window(start, end)?;
        Ok(Self {
            id,
            shift,
            start,
            end,
            roster,
            area,
            status: compute_status(now, start, end),
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a schedule from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ScheduleId,
        shift: ShiftKind,
        start: Timestamp,
        end: Timestamp,
        roster: Roster,
        area: PatrolAreaId,
        status: ScheduleStatus,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            shift,
            start,
            end,
            roster,
            area,
            status,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ScheduleId {
        &self.id
    }

    pub fn shift(&self) -> ShiftKind {
        self.shift
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn area(&self) -> &PatrolAreaId {
        &self.area
    }

    /// The cached status. Only meaningful right after [`Schedule::refresh_status`].
    pub fn cached_status(&self) -> ScheduleStatus {
        self.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Status derived from the given instant, ignoring the cache.
    pub fn status_at(&self, now: Timestamp) -> ScheduleStatus {
        compute_status(now, self.start, self.end)
    }

    /// Recomputes the cached status. Never touches `updated_at`.
    pub fn refresh_status(&mut self, now: Timestamp) -> ScheduleStatus {
        self.status = self.status_at(now);
        self.status
    }

    /// Returns a copy with its status recomputed for `now`.
    pub fn with_status_at(mut self, now: Timestamp) -> Self {
        self.refresh_status(now);
        self
    }

    pub fn is_rostered(&self, officer_id: &UserId) -> bool {
        self.roster.contains(officer_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Moves the shift window.
    ///
    /// # Errors
    ///
    /// - `StaleWrite` if the shift is no longer Upcoming
    /// - `ValidationFailed` if the new window is inverted
    pub fn reschedule(
        &mut self,
        start: Timestamp,
        end: Timestamp,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_mutable(now)?;
        Self::validate_window(start, end)?;
        self.start = start;
        self.end = end;
        self.touch(now);
        Ok(())
    }

    /// Changes the shift kind and patrol area.
    pub fn reassign(
        &mut self,
        shift: ShiftKind,
        area: PatrolAreaId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_mutable(now)?;
        self.shift = shift;
        self.area = area;
        self.touch(now);
        Ok(())
    }

    pub fn add_member(&mut self, member: RosterMember, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_mutable(now)?;
        self.roster.add_member(member)?;
        self.touch(now);
        Ok(())
    }

    pub fn remove_member(&mut self, officer_id: &UserId, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_mutable(now)?;
        self.roster.remove_member(officer_id)?;
        self.touch(now);
        Ok(())
    }

    pub fn set_leader(&mut self, officer_id: &UserId, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_mutable(now)?;
        self.roster.set_leader(officer_id)?;
        self.touch(now);
        Ok(())
    }

    /// Checks that the shift may be deleted at `now`.
    ///
    /// # Errors
    ///
    /// - `StaleWrite` while the shift is Ongoing
    pub fn ensure_deletable(&self, now: Timestamp) -> Result<(), DomainError> {
        let status = self.status_at(now);
        if status.is_deletable() {
            Ok(())
        } else {
            Err(DomainError::stale_write(format!(
                "Schedule {} is {} and cannot be deleted",
                self.id, status
            )))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn ensure_mutable(&self, now: Timestamp) -> Result<(), DomainError> {
        let status = self.status_at(now);
        if status.is_mutable() {
            Ok(())
        } else {
            Err(DomainError::stale_write(format!(
                "Schedule {} is {} and can no longer be edited",
                self.id, status
            ))
            .with_detail("status", status.to_string()))
        }
    }

    fn touch(&mut self, now: Timestamp) {
        self.updated_at = now;
        self.refresh_status(now);
    }

    fn validate_window(start: Timestamp, end: Timestamp) -> Result<(), DomainError> {
        if end.is_after(&start) {
            Ok(())
        } else {
            Err(DomainError::validation(
                "end",
                "Shift end must be after its start",
            ))
        }
    }
}
