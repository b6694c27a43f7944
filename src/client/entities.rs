//! Reconciliation rules for each entity kind.

use crate::domain::foundation::{
    ConversationId, MessageId, NotificationId, ScheduleId, Timestamp, UserId, VehicleId,
    VehicleRequestId,
};
use crate::domain::messaging::{Conversation, Message, Notification};
use crate::domain::schedule::{Schedule, ScheduleStatus};
use crate::domain::sync::{EntityKind, EntityState};
use crate::domain::vehicle::{Vehicle, VehicleRequest, VehicleStatus};

use super::merge::{Reconcilable, Version};

impl Reconcilable for Schedule {
    type Key = ScheduleId;
    const KIND: EntityKind = EntityKind::Schedule;

    fn key(&self) -> ScheduleId {
        *self.id()
    }

    fn version(&self) -> Version {
        Version::new(0, self.updated_at())
    }

    fn from_state(state: EntityState) -> Option<Self> {
        match state {
            EntityState::Schedule(s) => Some(s),
            _ => None,
        }
    }

    /// The server's status is a hint; the local clock decides.
    fn refresh_derived(&mut self, now: Timestamp) {
        self.refresh_status(now);
    }

    fn sort_view(items: &mut [Self]) {
        items.sort_by(|a, b| a.start().cmp(&b.start()).then(a.id().cmp(b.id())));
    }

    /// Shifts running right now.
    fn badge(items: &[Self], _viewer: &UserId) -> usize {
        items
            .iter()
            .filter(|s| s.cached_status() == ScheduleStatus::Ongoing)
            .count()
    }
}

impl Reconcilable for VehicleRequest {
    type Key = VehicleRequestId;
    const KIND: EntityKind = EntityKind::VehicleRequest;

    fn key(&self) -> VehicleRequestId {
        *self.id()
    }

    /// Lifecycle rank first: terminal beats Approved beats Pending.
    fn version(&self) -> Version {
        Version::new(self.status().rank(), self.updated_at())
    }

    fn from_state(state: EntityState) -> Option<Self> {
        match state {
            EntityState::VehicleRequest(r) => Some(r),
            _ => None,
        }
    }

    fn sort_view(items: &mut [Self]) {
        items.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(a.id().cmp(b.id())));
    }

    /// Approved plus pending requests.
    fn badge(items: &[Self], _viewer: &UserId) -> usize {
        items.iter().filter(|r| r.is_active()).count()
    }
}

impl Reconcilable for Vehicle {
    type Key = VehicleId;
    const KIND: EntityKind = EntityKind::Vehicle;

    fn key(&self) -> VehicleId {
        *self.id()
    }

    fn version(&self) -> Version {
        Version::new(0, self.updated_at())
    }

    fn from_state(state: EntityState) -> Option<Self> {
        match state {
            EntityState::Vehicle(v) => Some(v),
            _ => None,
        }
    }

    fn sort_view(items: &mut [Self]) {
        items.sort_by(|a, b| a.plate_number().cmp(b.plate_number()));
    }

    /// Vehicles free to book.
    fn badge(items: &[Self], _viewer: &UserId) -> usize {
        items
            .iter()
            .filter(|v| v.status() == VehicleStatus::Available)
            .count()
    }
}

impl Reconcilable for Conversation {
    type Key = ConversationId;
    const KIND: EntityKind = EntityKind::Conversation;

    fn key(&self) -> ConversationId {
        *self.id()
    }

    fn version(&self) -> Version {
        Version::new(0, self.updated_at())
    }

    fn from_state(state: EntityState) -> Option<Self> {
        match state {
            EntityState::Conversation(c) => Some(c),
            _ => None,
        }
    }

    /// Most recent activity first.
    fn sort_view(items: &mut [Self]) {
        items.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()).then(a.id().cmp(b.id())));
    }

    /// Conversations with something the viewer has not read.
    fn badge(items: &[Self], viewer: &UserId) -> usize {
        items
            .iter()
            .filter(|c| c.has_read(viewer) == Some(false))
            .count()
    }
}

impl Reconcilable for Message {
    type Key = MessageId;
    const KIND: EntityKind = EntityKind::Message;

    fn key(&self) -> MessageId {
        self.id()
    }

    /// Messages never change except for the read flag, which only sets.
    fn version(&self) -> Version {
        Version::new(u8::from(self.is_read()), self.created_at())
    }

    fn from_state(state: EntityState) -> Option<Self> {
        match state {
            EntityState::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Unread messages from the other participant.
    fn badge(items: &[Self], viewer: &UserId) -> usize {
        items
            .iter()
            .filter(|m| !m.is_read() && m.sender() != viewer)
            .count()
    }
}

impl Reconcilable for Notification {
    type Key = NotificationId;
    const KIND: EntityKind = EntityKind::Notification;

    fn key(&self) -> NotificationId {
        *self.id()
    }

    fn version(&self) -> Version {
        Version::new(u8::from(self.is_read()), self.updated_at())
    }

    fn from_state(state: EntityState) -> Option<Self> {
        match state {
            EntityState::Notification(n) => Some(n),
            _ => None,
        }
    }

    fn sort_view(items: &mut [Self]) {
        items.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(a.id().cmp(b.id())));
    }

    /// Unread count.
    fn badge(items: &[Self], _viewer: &UserId) -> usize {
        items.iter().filter(|n| !n.is_read()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::merge::{LocalStore, MergeOutcome};
    use crate::domain::foundation::{PatrolAreaId, ScheduleId};
    use crate::domain::schedule::{Roster, RosterMember, ShiftKind};
    use chrono::Duration;
    use proptest::prelude::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs)
    }

    #[test]
    fn schedule_status_is_recomputed_locally() {
        let mut schedule = Schedule::new(
            ScheduleId::new(),
            ShiftKind::Day,
            at(100),
            at(200),
            Roster::new(vec![
                RosterMember::leader(user("a")),
                RosterMember::member(user("b")),
            ])
            .unwrap(),
            PatrolAreaId::new("z").unwrap(),
            at(0),
        )
        .unwrap();
        assert_eq!(schedule.cached_status(), ScheduleStatus::Upcoming);

        schedule.refresh_derived(at(150));
        assert_eq!(schedule.cached_status(), ScheduleStatus::Ongoing);
        assert_eq!(Schedule::badge(&[schedule], &user("a")), 1);
    }

    #[test]
    fn read_message_is_not_regressed_by_unread_copy() {
        let unread = Message::new(MessageId::new(42), ConversationId::new(), user("a"), "hi", at(1))
            .unwrap();
        let mut read = unread.clone();
        read.mark_read();

        let mut store = LocalStore::new(Duration::seconds(30));
        store.upsert(read.clone(), at(2));
        store.upsert(unread, at(3));
        assert_eq!(store.get(&MessageId::new(42)), Some(&read));
    }

    #[test]
    fn message_badge_ignores_own_messages() {
        let conv = ConversationId::new();
        let messages = vec![
            Message::new(MessageId::new(1), conv, user("a"), "one", at(1)).unwrap(),
            Message::new(MessageId::new(2), conv, user("b"), "two", at(2)).unwrap(),
        ];
        assert_eq!(Message::badge(&messages, &user("a")), 1);
    }

    proptest! {
        #[test]
        fn unread_count_matches_held_notifications(
            ops in prop::collection::vec((0u8..6, any::<bool>()), 1..60)
        ) {
            let ids: Vec<NotificationId> = (0..6).map(|_| NotificationId::new()).collect();
            let mut store: LocalStore<Notification> = LocalStore::new(Duration::seconds(30));

            for (i, (which, read)) in ops.iter().enumerate() {
                let idx = *which as usize;
                let mut n = Notification::new(ids[idx], user("o-1"), "msg", at(0)).unwrap();
                if *read {
                    n.mark_read(at(1 + i as i64));
                }
                store.upsert(n, at(100 + i as i64));

                let held = store.values();
                let expected = held.iter().filter(|n| !n.is_read()).count();
                prop_assert_eq!(Notification::badge(&held, &user("o-1")), expected);
            }
        }
    }

    #[test]
    fn conversation_after_late_message_replaces_the_read_copy() {
        let mut conv = Conversation::new(ConversationId::new(), user("a"), user("b"), at(0)).unwrap();
        let first = Message::new(MessageId::new(1), *conv.id(), user("a"), "one", at(5)).unwrap();
        conv.record_message(&first).unwrap();
        conv.mark_read(&user("b"), at(10)).unwrap();

        let mut store = LocalStore::new(Duration::seconds(30));
        store.upsert(conv.clone(), at(10));

        let late = Message::new(MessageId::new(2), *conv.id(), user("a"), "two", at(9)).unwrap();
        conv.record_message(&late).unwrap();

        assert_eq!(store.upsert(conv.clone(), at(11)), MergeOutcome::Replaced);
        assert_eq!(Conversation::badge(&store.values(), &user("b")), 1);
    }
}
