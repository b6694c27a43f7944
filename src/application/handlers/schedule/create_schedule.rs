//! CreateScheduleHandler - Command handler for creating patrol shifts.

use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::application::handlers::Notifier;
use crate::domain::foundation::{CommandMetadata, DomainError, PatrolAreaId, ScheduleId, Timestamp};
use crate::domain::schedule::{Roster, RosterMember, Schedule, ShiftKind};
use crate::domain::sync::ChangeAction;
use crate::ports::ScheduleRepository;

/// Command to create a shift.
#[derive(Debug, Clone)]
pub struct CreateScheduleCommand {
    pub shift: ShiftKind,
    pub start: Timestamp,
    pub end: Timestamp,
    pub roster: Vec<RosterMember>,
    pub area: PatrolAreaId,
}

/// Result of successful schedule creation.
#[derive(Debug, Clone)]
pub struct CreateScheduleResult {
    pub schedule: Schedule,
    pub notified: usize,
}

/// Handler for creating schedules.
pub struct CreateScheduleHandler {
    repository: Arc<dyn ScheduleRepository>,
    publisher: Arc<ChangePublisher>,
    notifier: Arc<Notifier>,
}

impl CreateScheduleHandler {
    pub fn new(
        repository: Arc<dyn ScheduleRepository>,
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
        cmd: CreateScheduleCommand,
        metadata: CommandMetadata,
    ) -> Result<CreateScheduleResult, DomainError> {
        let now = self.publisher.clock().now();

        // 1. Validate roster and window
        let roster = Roster::new(cmd.roster)?;
        let schedule = Schedule::new(
            ScheduleId::new(),
            cmd.shift,
            cmd.start,
            cmd.end,
            roster,
            cmd.area,
            now,
        )?;

        // 2. Persist
        self.repository.insert(&schedule).await?;

        // 3. Publish to every rostered officer
        self.publisher
            .on_commit(
                Committed::Schedule(schedule.clone()),
                ChangeAction::Insert,
                &metadata,
            )
            .await;

        // 4. Notify the roster
        let message = format!(
            "You have been assigned a {} shift in {} starting {}",
            schedule.shift(),
            schedule.area(),
            schedule.start().to_rfc3339()
        );
        let notified = self
            .notifier
            .notify_all(schedule.roster().officer_ids(), &message, &metadata)
            .await;

        tracing::info!(
            schedule_id = %schedule.id(),
            roster = schedule.roster().len(),
            "Schedule created"
        );

        Ok(CreateScheduleResult { schedule, notified })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Harness;
    use crate::domain::foundation::{ErrorCode, UserId};
    use crate::domain::sync::EntityKind;

    fn handler(h: &Harness) -> CreateScheduleHandler {
        CreateScheduleHandler::new(h.schedules.clone(), h.publisher.clone(), h.notifier.clone())
    }

    fn command(roster: Vec<RosterMember>) -> CreateScheduleCommand {
        CreateScheduleCommand {
            shift: ShiftKind::Day,
            start: Timestamp::from_unix_secs(3_600),
            end: Timestamp::from_unix_secs(3_600 * 10),
            roster,
            area: PatrolAreaId::new("purok-3").unwrap(),
        }
    }

    fn officer(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn creates_publishes_and_notifies_roster() {
        let h = Harness::at(0);
        let result = handler(&h)
            .handle(
                command(vec![
                    RosterMember::leader(officer("lead")),
                    RosterMember::member(officer("o-1")),
                    RosterMember::member(officer("o-2")),
                ]),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert_eq!(result.notified, 3);
        assert!(h
            .schedules
            .find_by_id(result.schedule.id())
            .await
            .unwrap()
            .is_some());
        assert_eq!(h.broadcaster.of_kind(EntityKind::Schedule).len(), 3);
        assert_eq!(h.broadcaster.of_kind(EntityKind::Notification).len(), 3);
    }

    #[tokio::test]
    async fn roster_without_leader_is_rejected_and_nothing_published() {
        let h = Harness::at(0);
        let err = handler(&h)
            .handle(
                command(vec![
                    RosterMember::member(officer("o-1")),
                    RosterMember::member(officer("o-2")),
                ]),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::RosterInvariant);
        assert!(h.broadcaster.published().is_empty());
    }

    #[tokio::test]
    async fn single_officer_roster_is_rejected() {
        let h = Harness::at(0);
        let err = handler(&h)
            .handle(
                command(vec![RosterMember::leader(officer("lead"))]),
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RosterInvariant);
    }
}
