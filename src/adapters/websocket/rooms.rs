//! Room registry: which connection handles are subscribed to which rooms.
//!
//! Pure bookkeeping. A handle belongs to any number of rooms at once (its
//! user room, conversation rooms, the vehicle-requests feed) and owns one
//! bounded outbound channel that the hub and relay push into.
//!
//! # Architecture
//!
//! ```text
//! Room: user:officer-1       Room: vehicle-requests     Room: conversation:…
//! ├── handle-a               ├── handle-a               ├── handle-a
//! └── handle-b               └── handle-c               └── handle-d
//! ```
//!
//! Disconnecting a handle removes it from every room and drops its sender,
//! which ends the connection's forwarding task.

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::foundation::UserId;
use crate::domain::sync::Room;

use super::messages::ServerMessage;

/// Unique identifier for one live connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered handle's outbound edge.
#[derive(Debug, Clone)]
pub struct HandleSender {
    pub id: HandleId,
    pub user: UserId,
    pub sender: mpsc::Sender<ServerMessage>,
}

struct HandleEntry {
    user: UserId,
    sender: mpsc::Sender<ServerMessage>,
    rooms: HashSet<Room>,
}

#[derive(Default)]
struct Inner {
    rooms: HashMap<Room, HashSet<HandleId>>,
    handles: HashMap<HandleId, HandleEntry>,
}

/// Maps rooms to the handles currently subscribed to them.
///
/// # Thread Safety
///
/// Uses one `RwLock` over both indexes since publishes (reads) vastly
/// outnumber joins and leaves (writes), and the two maps must change
/// together.
pub struct RoomRegistry {
    inner: RwLock<Inner>,
    channel_capacity: usize,
}

impl RoomRegistry {
    /// Create a registry whose handles buffer up to `channel_capacity`
    /// outbound messages before further deliveries are dropped.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Registers a new connection for `user`.
    ///
    /// Returns its id and the receiving end of its outbound channel. The
    /// handle is in no room yet.
    pub async fn register(&self, user: UserId) -> (HandleId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let id = HandleId::new();
        self.inner.write().await.handles.insert(
            id,
            HandleEntry {
                user,
                sender: tx,
                rooms: HashSet::new(),
            },
        );
        (id, rx)
    }

    /// Adds `handle` to `room`. Idempotent.
    ///
    /// Returns false if the handle is not registered.
    pub async fn subscribe(&self, room: &Room, handle: &HandleId) -> bool {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.handles.get_mut(handle) else {
            return false;
        };
        entry.rooms.insert(room.clone());
        inner
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(*handle);
        true
    }

    /// Removes `handle` from `room`, dropping the room once empty.
    ///
    /// Returns true if the handle was a member.
    pub async fn unsubscribe(&self, room: &Room, handle: &HandleId) -> bool {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.handles.get_mut(handle) {
            entry.rooms.remove(room);
        }
        let removed = match inner.rooms.get_mut(room) {
            Some(members) => members.remove(handle),
            None => false,
        };
        if inner.rooms.get(room).is_some_and(|m| m.is_empty()) {
            inner.rooms.remove(room);
        }
        removed
    }

    /// Handles currently in `room`.
    pub async fn members_of(&self, room: &Room) -> HashSet<HandleId> {
        self.inner
            .read()
            .await
            .rooms
            .get(room)
            .cloned()
            .unwrap_or_default()
    }

    /// Outbound senders of every handle currently in `room`.
    pub async fn senders_of(&self, room: &Room) -> Vec<HandleSender> {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|id| {
                inner.handles.get(id).map(|entry| HandleSender {
                    id: *id,
                    user: entry.user.clone(),
                    sender: entry.sender.clone(),
                })
            })
            .collect()
    }

    /// Queues a message for one handle without blocking.
    ///
    /// Returns false if the handle is gone or its buffer is full.
    pub async fn send_direct(&self, handle: &HandleId, message: ServerMessage) -> bool {
        let sender = match self.inner.read().await.handles.get(handle) {
            Some(entry) => entry.sender.clone(),
            None => return false,
        };
        sender.try_send(message).is_ok()
    }

    /// Rooms `handle` is subscribed to.
    pub async fn rooms_of(&self, handle: &HandleId) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .inner
            .read()
            .await
            .handles
            .get(handle)
            .map(|entry| entry.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// User that owns `handle`.
    pub async fn user_of(&self, handle: &HandleId) -> Option<UserId> {
        self.inner
            .read()
            .await
            .handles
            .get(handle)
            .map(|entry| entry.user.clone())
    }

    /// Removes `handle` from every room it joined and drops its sender.
    ///
    /// Returns the rooms it left.
    pub async fn disconnect(&self, handle: &HandleId) -> Vec<Room> {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.handles.remove(handle) else {
            return Vec::new();
        };
        let rooms: Vec<Room> = entry.rooms.into_iter().collect();
        for room in &rooms {
            if let Some(members) = inner.rooms.get_mut(room) {
                members.remove(handle);
                if members.is_empty() {
                    inner.rooms.remove(room);
                }
            }
        }
        rooms
    }

    /// Disconnects every handle. Returns how many were dropped.
    pub async fn disconnect_all(&self) -> usize {
        let mut inner = self.inner.write().await;
        let count = inner.handles.len();
        inner.handles.clear();
        inner.rooms.clear();
        count
    }

    /// Number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.len()
    }

    /// Number of registered handles.
    pub async fn handle_count(&self) -> usize {
        self.inner.read().await.handles.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ConversationId;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn subscribe_adds_handle_to_room() {
        let registry = RoomRegistry::default();
        let (handle, _rx) = registry.register(user("o-1")).await;

        assert!(registry.subscribe(&Room::VehicleRequests, &handle).await);
        assert!(registry
            .members_of(&Room::VehicleRequests)
            .await
            .contains(&handle));
    }

    #[tokio::test]
    async fn subscribe_unknown_handle_is_refused() {
        let registry = RoomRegistry::default();
        assert!(!registry.subscribe(&Room::VehicleRequests, &HandleId::new()).await);
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn handle_can_join_many_rooms() {
        let registry = RoomRegistry::default();
        let (handle, _rx) = registry.register(user("o-1")).await;
        let conv = Room::Conversation(ConversationId::new());

        registry.subscribe(&Room::user(&user("o-1")), &handle).await;
        registry.subscribe(&Room::VehicleRequests, &handle).await;
        registry.subscribe(&conv, &handle).await;

        assert_eq!(registry.rooms_of(&handle).await.len(), 3);
        assert_eq!(registry.room_count().await, 3);
    }

    #[tokio::test]
    async fn unsubscribe_cleans_up_empty_room() {
        let registry = RoomRegistry::default();
        let (handle, _rx) = registry.register(user("o-1")).await;
        registry.subscribe(&Room::VehicleRequests, &handle).await;

        assert!(registry.unsubscribe(&Room::VehicleRequests, &handle).await);
        assert!(!registry.unsubscribe(&Room::VehicleRequests, &handle).await);
        assert_eq!(registry.room_count().await, 0);
        assert!(registry.rooms_of(&handle).await.is_empty());
    }

    #[tokio::test]
    async fn disconnect_removes_handle_from_every_room() {
        let registry = RoomRegistry::default();
        let (a, _rx_a) = registry.register(user("o-1")).await;
        let (b, _rx_b) = registry.register(user("o-2")).await;
        registry.subscribe(&Room::VehicleRequests, &a).await;
        registry.subscribe(&Room::VehicleRequests, &b).await;
        registry.subscribe(&Room::user(&user("o-1")), &a).await;

        let left = registry.disconnect(&a).await;

        assert_eq!(left.len(), 2);
        assert_eq!(registry.handle_count().await, 1);
        assert_eq!(registry.room_count().await, 1);
        assert!(!registry
            .members_of(&Room::VehicleRequests)
            .await
            .contains(&a));
    }

    #[tokio::test]
    async fn disconnect_closes_outbound_channel() {
        let registry = RoomRegistry::default();
        let (handle, mut rx) = registry.register(user("o-1")).await;

        registry.disconnect(&handle).await;

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_direct_reaches_only_that_handle() {
        let registry = RoomRegistry::default();
        let (a, mut rx_a) = registry.register(user("o-1")).await;
        let (_b, mut rx_b) = registry.register(user("o-1")).await;

        assert!(registry.send_direct(&a, ServerMessage::pong()).await);

        assert!(matches!(rx_a.recv().await, Some(ServerMessage::Pong(_))));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_direct_fails_when_buffer_full() {
        let registry = RoomRegistry::new(1);
        let (handle, _rx) = registry.register(user("o-1")).await;

        assert!(registry.send_direct(&handle, ServerMessage::pong()).await);
        assert!(!registry.send_direct(&handle, ServerMessage::pong()).await);
    }

    #[tokio::test]
    async fn handle_id_display_is_uuid() {
        assert_eq!(HandleId::new().to_string().len(), 36);
    }
}
