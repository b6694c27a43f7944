//! UpdateScheduleHandler - Command handler for editing an upcoming shift.
//!
//! All requested edits are applied to a loaded copy first. Nothing is
//! written unless every edit succeeds, and the write is conditional on the
//! row not having changed since it was loaded.

use std::collections::HashSet;
use std::sync::Arc;

use crate::application::change_publisher::{ChangePublisher, Committed};
use crate::application::handlers::Notifier;
use crate::domain::foundation::{
    CommandMetadata, DomainError, ErrorCode, PatrolAreaId, ScheduleId, Timestamp, UserId,
};
use crate::domain::schedule::{RosterMember, Schedule, ShiftKind};
use crate::domain::sync::{ChangeAction, Room};
use crate::ports::ScheduleRepository;

/// Command to edit a shift.
///
/// Roster edits apply in the order: additions, leader change, removals.
/// This lets one command hand the leader flag to a newcomer and drop the
/// old leader.
#[derive(Debug, Clone, Default)]
pub struct UpdateScheduleCommand {
    pub schedule_id: ScheduleId,
    /// The `updatedAt` the caller last saw. A mismatch is a `StaleWrite`.
    pub expected_updated_at: Option<Timestamp>,
    pub window: Option<(Timestamp, Timestamp)>,
    pub reassignment: Option<(ShiftKind, PatrolAreaId)>,
    pub add_members: Vec<UserId>,
    pub leader: Option<UserId>,
    pub remove_members: Vec<UserId>,
}

impl UpdateScheduleCommand {
    fn is_empty(&self) -> bool {
        self.window.is_none()
            && self.reassignment.is_none()
            && self.add_members.is_empty()
            && self.leader.is_none()
            && self.remove_members.is_empty()
    }
}

/// Result of a successful schedule edit.
#[derive(Debug, Clone)]
pub struct UpdateScheduleResult {
    pub schedule: Schedule,
    /// Officers no longer on the roster.
    pub removed: Vec<UserId>,
}

/// Handler for editing schedules.
pub struct UpdateScheduleHandler {
    repository: Arc<dyn ScheduleRepository>,
    publisher: Arc<ChangePublisher>,
    notifier: Arc<Notifier>,
}

impl UpdateScheduleHandler {
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
        cmd: UpdateScheduleCommand,
        metadata: CommandMetadata,
    ) -> Result<UpdateScheduleResult, DomainError> {
        if cmd.is_empty() {
            return Err(DomainError::validation("changes", "No changes requested"));
        }
        let now = self.publisher.clock().now();

        // 1. Load
        let loaded = self
            .repository
            .find_by_id(&cmd.schedule_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ScheduleNotFound,
                    format!("Schedule {} not found", cmd.schedule_id),
                )
            })?;

        if let Some(expected) = cmd.expected_updated_at {
            if expected != loaded.updated_at() {
                return Err(DomainError::stale_write(format!(
                    "Schedule {} changed since it was read",
                    cmd.schedule_id
                )));
            }
        }

        // 2. Apply every edit to a copy
        let before: HashSet<UserId> = loaded.roster().officer_ids().cloned().collect();
        let mut schedule = loaded.clone();
        let rescheduled = cmd.window.is_some();

        if let Some((start, end)) = cmd.window {
            schedule.reschedule(start, end, now)?;
        }
        if let Some((shift, area)) = cmd.reassignment {
            schedule.reassign(shift, area, now)?;
        }
        for officer in cmd.add_members {
            schedule.add_member(RosterMember::member(officer), now)?;
        }
        if let Some(leader) = &cmd.leader {
            schedule.set_leader(leader, now)?;
        }
        for officer in &cmd.remove_members {
            schedule.remove_member(officer, now)?;
        }

        // 3. Conditional write
        self.repository
            .update_if_unchanged(&schedule, loaded.updated_at())
            .await?;

        // 4. Publish to the new roster; removed officers get a delete
        self.publisher
            .on_commit(
                Committed::Schedule(schedule.clone()),
                ChangeAction::Update,
                &metadata,
            )
            .await;

        let mut removed: Vec<UserId> = before
            .into_iter()
            .filter(|officer| !schedule.is_rostered(officer))
            .collect();
        removed.sort();
        if !removed.is_empty() {
            self.publisher
                .publish_to(
                    removed.iter().map(Room::user).collect(),
                    Committed::Schedule(schedule.clone()),
                    ChangeAction::Delete,
                    &metadata,
                )
                .await;
        }

        // 5. Notify on a moved window
        if rescheduled {
            let message = format!(
                "Your {} shift in {} now starts {}",
                schedule.shift(),
                schedule.area(),
                schedule.start().to_rfc3339()
            );
            self.notifier
                .notify_all(schedule.roster().officer_ids(), &message, &metadata)
                .await;
        }

        tracing::info!(schedule_id = %schedule.id(), removed = removed.len(), "Schedule updated");

        Ok(UpdateScheduleResult { schedule, removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Harness;
    use crate::domain::foundation::Clock;
    use crate::domain::schedule::{Roster, ScheduleStatus};
    use crate::domain::sync::EntityKind;

    fn officer(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn seeded(h: &Harness) -> Schedule {
        let schedule = Schedule::new(
            ScheduleId::new(),
            ShiftKind::Night,
            Timestamp::from_unix_secs(10_000),
            Timestamp::from_unix_secs(20_000),
            Roster::new(vec![
                RosterMember::leader(officer("lead")),
                RosterMember::member(officer("o-1")),
            ])
            .unwrap(),
            PatrolAreaId::new("zone-1").unwrap(),
            Timestamp::from_unix_secs(0),
        )
        .unwrap();
        h.schedules.insert(&schedule).await.unwrap();
        schedule
    }

    fn handler(h: &Harness) -> UpdateScheduleHandler {
        UpdateScheduleHandler::new(h.schedules.clone(), h.publisher.clone(), h.notifier.clone())
    }

    #[tokio::test]
    async fn leader_handover_and_removal_in_one_command() {
        let h = Harness::at(100);
        let schedule = seeded(&h).await;

        let result = handler(&h)
            .handle(
                UpdateScheduleCommand {
                    schedule_id: *schedule.id(),
                    add_members: vec![officer("o-2")],
                    leader: Some(officer("o-2")),
                    remove_members: vec![officer("lead")],
                    ..Default::default()
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert_eq!(result.schedule.roster().leader(), Some(&officer("o-2")));
        assert_eq!(result.removed, vec![officer("lead")]);

        let deletes: Vec<_> = h
            .broadcaster
            .of_kind(EntityKind::Schedule)
            .into_iter()
            .filter(|(_, e)| e.action == ChangeAction::Delete)
            .collect();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].0, Room::user(&officer("lead")));
    }

    #[tokio::test]
    async fn ongoing_shift_cannot_be_edited() {
        let h = Harness::at(15_000);
        let schedule = seeded(&h).await;

        let err = handler(&h)
            .handle(
                UpdateScheduleCommand {
                    schedule_id: *schedule.id(),
                    add_members: vec![officer("o-2")],
                    ..Default::default()
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::StaleWrite);
        let stored = h.schedules.find_by_id(schedule.id()).await.unwrap().unwrap();
        assert_eq!(stored.roster().len(), 2);
        assert!(h.broadcaster.published().is_empty());
    }

    #[tokio::test]
    async fn mismatched_expectation_is_stale() {
        let h = Harness::at(100);
        let schedule = seeded(&h).await;

        let err = handler(&h)
            .handle(
                UpdateScheduleCommand {
                    schedule_id: *schedule.id(),
                    expected_updated_at: Some(Timestamp::from_unix_secs(1)),
                    reassignment: Some((ShiftKind::Day, PatrolAreaId::new("zone-9").unwrap())),
                    ..Default::default()
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StaleWrite);
    }

    #[tokio::test]
    async fn failing_edit_leaves_schedule_untouched() {
        let h = Harness::at(100);
        let schedule = seeded(&h).await;

        let err = handler(&h)
            .handle(
                UpdateScheduleCommand {
                    schedule_id: *schedule.id(),
                    reassignment: Some((ShiftKind::Day, PatrolAreaId::new("zone-9").unwrap())),
                    remove_members: vec![officer("o-1")],
                    ..Default::default()
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::RosterInvariant);
        let stored = h.schedules.find_by_id(schedule.id()).await.unwrap().unwrap();
        assert_eq!(stored.area().as_str(), "zone-1");
    }

    #[tokio::test]
    async fn reschedule_notifies_roster() {
        let h = Harness::at(100);
        let schedule = seeded(&h).await;

        let result = handler(&h)
            .handle(
                UpdateScheduleCommand {
                    schedule_id: *schedule.id(),
                    window: Some((
                        Timestamp::from_unix_secs(30_000),
                        Timestamp::from_unix_secs(40_000),
                    )),
                    ..Default::default()
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert_eq!(result.schedule.status_at(h.clock.now()), ScheduleStatus::Upcoming);
        assert_eq!(h.broadcaster.of_kind(EntityKind::Notification).len(), 2);
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let h = Harness::at(100);
        let schedule = seeded(&h).await;
        let err = handler(&h)
            .handle(
                UpdateScheduleCommand {
                    schedule_id: *schedule.id(),
                    ..Default::default()
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }
}
