//! In-memory schedule store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, ScheduleId, Timestamp, UserId};
use crate::domain::schedule::Schedule;
use crate::ports::ScheduleRepository;

/// Schedule repository backed by a single `RwLock`ed map.
///
/// Conditional writes check and write under the same write guard.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    schedules: RwLock<HashMap<ScheduleId, Schedule>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: &ScheduleId) -> DomainError {
    DomainError::new(
        ErrorCode::ScheduleNotFound,
        format!("Schedule {} not found", id),
    )
}

fn stale(id: &ScheduleId) -> DomainError {
    DomainError::stale_write(format!(
        "Schedule {} was modified by someone else; refresh and retry",
        id
    ))
}

fn sorted(mut schedules: Vec<Schedule>) -> Vec<Schedule> {
    schedules.sort_by_key(|s| (s.start(), *s.id()));
    schedules
}

#[async_trait]
impl ScheduleRepository for InMemoryScheduleStore {
    async fn insert(&self, schedule: &Schedule) -> Result<(), DomainError> {
        let mut schedules = self.schedules.write().await;
        if schedules.contains_key(schedule.id()) {
            return Err(DomainError::validation(
                "id",
                format!("Schedule {} already exists", schedule.id()),
            ));
        }
        schedules.insert(*schedule.id(), schedule.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ScheduleId) -> Result<Option<Schedule>, DomainError> {
        Ok(self.schedules.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Schedule>, DomainError> {
        Ok(sorted(self.schedules.read().await.values().cloned().collect()))
    }

    async fn list_for_officer(&self, officer_id: &UserId) -> Result<Vec<Schedule>, DomainError> {
        Ok(sorted(
            self.schedules
                .read()
                .await
                .values()
                .filter(|s| s.is_rostered(officer_id))
                .cloned()
                .collect(),
        ))
    }

    async fn update_if_unchanged(
        &self,
        schedule: &Schedule,
        expected: Timestamp,
    ) -> Result<(), DomainError> {
        let mut schedules = self.schedules.write().await;
        let stored = schedules
            .get_mut(schedule.id())
            .ok_or_else(|| not_found(schedule.id()))?;
        if stored.updated_at() != expected {
            return Err(stale(schedule.id()));
        }
        *stored = schedule.clone();
        Ok(())
    }

    async fn delete_if_unchanged(
        &self,
        id: &ScheduleId,
        expected: Timestamp,
    ) -> Result<Schedule, DomainError> {
        let mut schedules = self.schedules.write().await;
        let stored = schedules.get(id).ok_or_else(|| not_found(id))?;
        if stored.updated_at() != expected {
            return Err(stale(id));
        }
        schedules.remove(id).ok_or_else(|| not_found(id))
    }
}
