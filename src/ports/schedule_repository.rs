//! Schedule repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ScheduleId, Timestamp, UserId};
use crate::domain::schedule::Schedule;

/// Repository port for patrol shifts.
///
/// Writes after the initial insert are conditional on the `updated_at`
/// the caller read, so two administrators editing the same shift cannot
/// silently overwrite each other.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Stores a new shift.
    async fn insert(&self, schedule: &Schedule) -> Result<(), DomainError>;

    /// Find a shift by id. Returns `None` if not found.
    async fn find_by_id(&self, id: &ScheduleId) -> Result<Option<Schedule>, DomainError>;

    /// All shifts ordered by start ascending.
    async fn list(&self) -> Result<Vec<Schedule>, DomainError>;

    /// Shifts whose roster contains `officer_id`, ordered by start.
    async fn list_for_officer(&self, officer_id: &UserId) -> Result<Vec<Schedule>, DomainError>;

    /// Replaces a shift if its stored `updated_at` still equals `expected`.
    ///
    /// # Errors
    ///
    /// - `ScheduleNotFound` if the shift is gone
    /// - `StaleWrite` if someone else wrote first
    async fn update_if_unchanged(
        &self,
        schedule: &Schedule,
        expected: Timestamp,
    ) -> Result<(), DomainError>;

    /// Deletes a shift if its stored `updated_at` still equals `expected`.
    ///
    /// # Errors
    ///
    /// - `ScheduleNotFound` if the shift is gone
    /// - `StaleWrite` if someone else wrote first
    async fn delete_if_unchanged(
        &self,
        id: &ScheduleId,
        expected: Timestamp,
    ) -> Result<Schedule, DomainError>;
}
