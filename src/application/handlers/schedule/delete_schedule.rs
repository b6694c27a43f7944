//! DeleteScheduleHandler - Command handler for removing a shift.

use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::domain::foundation::{CommandMetadata, DomainError, ErrorCode, ScheduleId};
use crate::domain::schedule::Schedule;
use crate::domain::sync::ChangeAction;
use crate::ports::ScheduleRepository;

/// Command to delete a shift.
#[derive(Debug, Clone)]
pub struct DeleteScheduleCommand {
    pub schedule_id: ScheduleId,
}

/// Handler for deleting schedules. Refused while the shift is running.
pub struct DeleteScheduleHandler {
    repository: Arc<dyn ScheduleRepository>,
    publisher: Arc<ChangePublisher>,
}

impl DeleteScheduleHandler {
    pub fn new(repository: Arc<dyn ScheduleRepository>, publisher: Arc<ChangePublisher>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Returns the deleted schedule as it was last stored.
    pub async fn handle(
        &self,
        cmd: DeleteScheduleCommand,
        metadata: CommandMetadata,
    ) -> Result<Schedule, DomainError> {
        let now = self.publisher.clock().now();

        let schedule = self
            .repository
            .find_by_id(&cmd.schedule_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ScheduleNotFound,
                    format!("Schedule {} not found", cmd.schedule_id),
                )
            })?;

        schedule.ensure_deletable(now)?;

        let deleted = self
            .repository
            .delete_if_unchanged(&cmd.schedule_id, schedule.updated_at())
            .await?;

        self.publisher
            .on_commit(
                Committed::Schedule(deleted.clone()),
                ChangeAction::Delete,
                &metadata,
            )
            .await;

        tracing::info!(schedule_id = %cmd.schedule_id, "Schedule deleted");
        Ok(deleted)
    }
}
