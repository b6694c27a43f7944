//! Push edge of the reconciler.
//!
//! Whatever transport carries [`ServerMessage`]s to the client feeds a
//! [`PushRouter`], which validates each change envelope at the boundary and
//! forwards it to the streams whose kind and scope match. Connection
//! lifecycle is broadcast to every stream so each can resync on its own.
//!
//! [`PushRouter::run`] owns the connection: it pumps one connection until it
//! closes, then reconnects through a [`PushConnector`] with exponential
//! backoff, reporting every failure and the eventual recovery to the streams.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::adapters::websocket::ServerMessage;
use crate::domain::foundation::{ConversationId, UserId};
use crate::domain::sync::{ChangeAction, EntityKind, EntityState};
use crate::ports::PullError;

/// Input from the push channel to one stream.
#[derive(Debug, Clone, PartialEq)]
pub enum PushSignal {
    /// A validated change for this stream's kind.
    Change {
        action: ChangeAction,
        state: EntityState,
    },
    Disconnected,
    Reconnected,
    /// A reconnect attempt failed. `attempts` counts consecutive failures.
    ReconnectFailed { attempts: u32 },
}

/// Narrows a route to the entities its stream pulls.
pub type PushScope = Arc<dyn Fn(&EntityState) -> bool + Send + Sync>;

struct Route {
    sender: mpsc::Sender<PushSignal>,
    scope: Option<PushScope>,
}

impl Route {
    fn accepts(&self, state: &EntityState) -> bool {
        self.scope.as_ref().map_or(true, |scope| scope(state))
    }
}

/// Fans a single push connection out to per-kind streams.
#[derive(Default)]
pub struct PushRouter {
    routes: HashMap<EntityKind, Vec<Route>>,
}

impl fmt::Debug for PushRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<(EntityKind, usize)> = self
            .routes
            .iter()
            .map(|(kind, routes)| (*kind, routes.len()))
            .collect();
        f.debug_struct("PushRouter").field("routes", &routes).finish()
    }
}

impl PushRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the receiving end for a stream of every `kind` entity.
    pub fn route(&mut self, kind: EntityKind, capacity: usize) -> mpsc::Receiver<PushSignal> {
        self.add_route(kind, capacity, None)
    }

    /// Creates the receiving end for a stream that only holds the `kind`
    /// entities accepted by `scope`.
    ///
    /// A stream whose pull covers a subset of its rooms (one conversation's
    /// messages, one officer's requests) must be routed this way, or pushes
    /// from the rest of the room would enter its view.
    pub fn route_where<F>(
        &mut self,
        kind: EntityKind,
        capacity: usize,
        scope: F,
    ) -> mpsc::Receiver<PushSignal>
    where
        F: Fn(&EntityState) -> bool + Send + Sync + 'static,
    {
        self.add_route(kind, capacity, Some(Arc::new(scope)))
    }

    /// Message stream for one conversation thread.
    pub fn route_conversation(
        &mut self,
        conversation_id: ConversationId,
        capacity: usize,
    ) -> mpsc::Receiver<PushSignal> {
        self.route_where(EntityKind::Message, capacity, move |state| {
            matches!(state, EntityState::Message(m) if *m.conversation_id() == conversation_id)
        })
    }

    /// Vehicle request stream for the requests filed by `requester`.
    pub fn route_requests_by(
        &mut self,
        requester: UserId,
        capacity: usize,
    ) -> mpsc::Receiver<PushSignal> {
        self.route_where(EntityKind::VehicleRequest, capacity, move |state| {
            matches!(state, EntityState::VehicleRequest(r) if *r.requester() == requester)
        })
    }

    fn add_route(
        &mut self,
        kind: EntityKind,
        capacity: usize,
        scope: Option<PushScope>,
    ) -> mpsc::Receiver<PushSignal> {
        let (sender, rx) = mpsc::channel(capacity);
        self.routes
            .entry(kind)
            .or_default()
            .push(Route { sender, scope });
        rx
    }

    /// Routes one server message. Returns how many streams received it.
    pub async fn dispatch(&self, message: ServerMessage) -> usize {
        let ServerMessage::Change(envelope) = message else {
            return 0;
        };

        let state = match envelope.decode() {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!(
                    event_id = %envelope.event_id,
                    entity_type = %envelope.entity_type,
                    "Dropping invalid envelope: {}",
                    e
                );
                return 0;
            }
        };

        let Some(routes) = self.routes.get(&envelope.entity_type) else {
            return 0;
        };
        let mut delivered = 0;
        for route in routes.iter().filter(|r| r.accepts(&state)) {
            let signal = PushSignal::Change {
                action: envelope.action,
                state: state.clone(),
            };
            if route.sender.send(signal).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Sends a lifecycle signal to every stream.
    pub async fn broadcast(&self, signal: PushSignal) {
        for route in self.routes.values().flatten() {
            // A torn-down stream has dropped its receiver.
            let _ = route.sender.send(signal.clone()).await;
        }
    }

    /// Forwards everything from one connection until it closes, then
    /// reports the disconnect.
    pub async fn pump(&self, mut inbound: mpsc::Receiver<ServerMessage>) {
        while let Some(message) = inbound.recv().await {
            self.dispatch(message).await;
        }
        self.broadcast(PushSignal::Disconnected).await;
    }

    /// Keeps the push channel alive until `shutdown` fires.
    ///
    /// Streams start out assuming a live channel. A lost or refused
    /// connection is reported once as `Disconnected`, each failed attempt
    /// as `ReconnectFailed`, and the first success after a loss as
    /// `Reconnected`, which makes every stream force a pull.
    pub async fn run(
        self: Arc<Self>,
        connector: Arc<dyn PushConnector>,
        backoff: ReconnectBackoff,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut connected = true;
        let mut attempts: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }
            let outcome = tokio::select! {
                _ = shutdown.changed() => break,
                outcome = connector.connect() => outcome,
            };

            match outcome {
                Ok(inbound) => {
                    if !connected {
                        tracing::info!(attempts, "Push channel reconnected");
                        self.broadcast(PushSignal::Reconnected).await;
                        connected = true;
                    }
                    attempts = 0;

                    if !self.forward(inbound, &mut shutdown).await {
                        break;
                    }
                    tracing::debug!("Push channel closed");
                    self.broadcast(PushSignal::Disconnected).await;
                    connected = false;
                }
                Err(error) => {
                    if connected {
                        self.broadcast(PushSignal::Disconnected).await;
                        connected = false;
                    }
                    attempts = attempts.saturating_add(1);
                    tracing::debug!(attempts, "Push connect failed: {}", error);
                    self.broadcast(PushSignal::ReconnectFailed { attempts }).await;

                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(backoff.delay(attempts)) => {}
                    }
                }
            }
        }

        tracing::debug!("Push supervisor stopped");
    }

    /// Dispatches until the connection closes (true) or shutdown (false).
    async fn forward(
        &self,
        mut inbound: mpsc::Receiver<ServerMessage>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        loop {
            tokio::select! {
                _ = shutdown.changed() => return false,
                message = inbound.recv() => match message {
                    Some(message) => {
                        self.dispatch(message).await;
                    }
                    None => return true,
                },
            }
        }
    }
}

/// Opens one push connection for [`PushRouter::run`].
#[async_trait]
pub trait PushConnector: Send + Sync {
    /// The returned channel closes when the connection drops.
    async fn connect(&self) -> Result<mpsc::Receiver<ServerMessage>, PullError>;
}

/// Exponential delay between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl ReconnectBackoff {
    /// Wait after `attempts` consecutive failures: `initial`, doubling, capped at `max`.
    pub fn delay(&self, attempts: u32) -> Duration {
        let doublings = attempts.saturating_sub(1).min(16);
        self.initial
            .saturating_mul(1u32 << doublings)
            .min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{MessageId, Timestamp, VehicleId, VehicleRequestId};
    use crate::domain::messaging::Message;
    use crate::domain::sync::{ChangeEnvelope, Room};
    use crate::domain::vehicle::VehicleRequest;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn message_in(conversation_id: ConversationId, id: u64) -> ChangeEnvelope {
        let message = Message::new(
            MessageId::new(id),
            conversation_id,
            UserId::new("a").unwrap(),
            "hi",
            Timestamp::from_unix_secs(0),
        )
        .unwrap();
        ChangeEnvelope::new(
            Room::conversation(&conversation_id),
            ChangeAction::Insert,
            &EntityState::Message(message),
            Timestamp::from_unix_secs(0),
        )
        .unwrap()
    }

    fn message_envelope() -> ChangeEnvelope {
        message_in(ConversationId::new(), 42)
    }

    fn request_by(requester: &str) -> ChangeEnvelope {
        let request = VehicleRequest::new(
            VehicleRequestId::new(),
            VehicleId::new(),
            UserId::new(requester).unwrap(),
            100,
            "Purok 1",
            "Patrol",
            Timestamp::from_unix_secs(0),
        )
        .unwrap();
        ChangeEnvelope::new(
            Room::VehicleRequests,
            ChangeAction::Insert,
            &EntityState::VehicleRequest(request),
            Timestamp::from_unix_secs(0),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn change_goes_only_to_matching_kind() {
        let mut router = PushRouter::new();
        let mut messages = router.route(EntityKind::Message, 8);
        let mut notifications = router.route(EntityKind::Notification, 8);

        let delivered = router.dispatch(ServerMessage::Change(message_envelope())).await;

        assert_eq!(delivered, 1);
        assert!(matches!(
            messages.try_recv(),
            Ok(PushSignal::Change {
                action: ChangeAction::Insert,
                ..
            })
        ));
        assert!(notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn conversation_route_ignores_other_threads() {
        let thread_a = ConversationId::new();
        let thread_b = ConversationId::new();
        let mut router = PushRouter::new();
        let mut a = router.route_conversation(thread_a, 8);
        let mut b = router.route_conversation(thread_b, 8);

        let delivered = router.dispatch(ServerMessage::Change(message_in(thread_b, 7))).await;

        assert_eq!(delivered, 1);
        assert!(a.try_recv().is_err());
        assert!(matches!(b.try_recv(), Ok(PushSignal::Change { .. })));
    }

    #[tokio::test]
    async fn requester_route_ignores_other_officers() {
        let mut router = PushRouter::new();
        let mut mine = router.route_requests_by(UserId::new("o-1").unwrap(), 8);
        let mut all = router.route(EntityKind::VehicleRequest, 8);

        router.dispatch(ServerMessage::Change(request_by("o-2"))).await;
        assert!(mine.try_recv().is_err());
        assert!(all.try_recv().is_ok());

        router.dispatch(ServerMessage::Change(request_by("o-1"))).await;
        assert!(mine.try_recv().is_ok());
    }

    #[tokio::test]
    async fn lifecycle_reaches_scoped_routes_too() {
        let mut router = PushRouter::new();
        let mut scoped = router.route_conversation(ConversationId::new(), 8);

        router.broadcast(PushSignal::Reconnected).await;

        assert_eq!(scoped.try_recv(), Ok(PushSignal::Reconnected));
    }

    #[tokio::test]
    async fn invalid_state_is_dropped_at_the_boundary() {
        let mut router = PushRouter::new();
        let mut messages = router.route(EntityKind::Message, 8);
        let mut envelope = message_envelope();
        envelope.state = serde_json::json!({"unexpected": true});

        assert_eq!(router.dispatch(ServerMessage::Change(envelope)).await, 0);
        assert!(messages.try_recv().is_err());
    }

    #[tokio::test]
    async fn pump_reports_disconnect_when_connection_closes() {
        let mut router = PushRouter::new();
        let mut messages = router.route(EntityKind::Message, 8);
        let (tx, rx) = mpsc::channel(8);
        tx.send(ServerMessage::Change(message_envelope())).await.unwrap();
        tx.send(ServerMessage::pong()).await.unwrap();
        drop(tx);

        router.pump(rx).await;

        assert!(matches!(messages.recv().await, Some(PushSignal::Change { .. })));
        assert_eq!(messages.recv().await, Some(PushSignal::Disconnected));
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let backoff = ReconnectBackoff {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(700),
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(700));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_millis(700));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Supervisor
    // ─────────────────────────────────────────────────────────────────────

    /// Hands out scripted outcomes, then never connects again.
    struct ScriptedConnector {
        script: Mutex<VecDeque<Result<mpsc::Receiver<ServerMessage>, PullError>>>,
    }

    impl ScriptedConnector {
        fn new(script: Vec<Result<mpsc::Receiver<ServerMessage>, PullError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl PushConnector for ScriptedConnector {
        async fn connect(&self) -> Result<mpsc::Receiver<ServerMessage>, PullError> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(outcome) => outcome,
                None => futures::future::pending().await,
            }
        }
    }

    fn fast_backoff() -> ReconnectBackoff {
        ReconnectBackoff {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(5),
        }
    }

    async fn next(rx: &mut mpsc::Receiver<PushSignal>) -> PushSignal {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("signal in time")
            .expect("route open")
    }

    #[tokio::test]
    async fn supervisor_reports_failures_then_recovers() {
        let mut router = PushRouter::new();
        let mut signals = router.route(EntityKind::Message, 32);
        let router = Arc::new(router);

        let (server_tx, server_rx) = mpsc::channel(8);
        let connector = Arc::new(ScriptedConnector::new(vec![
            Err(PullError::Transport("refused".to_string())),
            Err(PullError::Timeout),
            Ok(server_rx),
        ]));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = tokio::spawn(router.clone().run(connector, fast_backoff(), shutdown_rx));

        assert_eq!(next(&mut signals).await, PushSignal::Disconnected);
        assert_eq!(next(&mut signals).await, PushSignal::ReconnectFailed { attempts: 1 });
        assert_eq!(next(&mut signals).await, PushSignal::ReconnectFailed { attempts: 2 });
        assert_eq!(next(&mut signals).await, PushSignal::Reconnected);

        server_tx
            .send(ServerMessage::Change(message_envelope()))
            .await
            .unwrap();
        assert!(matches!(next(&mut signals).await, PushSignal::Change { .. }));

        drop(server_tx);
        assert_eq!(next(&mut signals).await, PushSignal::Disconnected);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), supervisor)
            .await
            .expect("supervisor stops")
            .unwrap();
    }

    #[tokio::test]
    async fn first_successful_connect_is_silent() {
        let mut router = PushRouter::new();
        let mut signals = router.route(EntityKind::Message, 8);
        let router = Arc::new(router);

        let (_server_tx, server_rx) = mpsc::channel(8);
        let connector = Arc::new(ScriptedConnector::new(vec![Ok(server_rx)]));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = tokio::spawn(router.clone().run(connector, fast_backoff(), shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(signals.try_recv().is_err());

        shutdown_tx.send(true).unwrap();
        supervisor.await.unwrap();
        assert!(signals.try_recv().is_err());
    }
}
