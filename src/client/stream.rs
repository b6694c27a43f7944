//! One reconciled entity stream.
//!
//! A single task owns the [`LocalStore`] and processes one input at a time:
//! push signals, poll ticks, finished pulls and user commands. Each merge
//! runs to completion before the next input is read, so the two edges can
//! never interleave inside a merge.
//!
//! # Lifecycle
//!
//! ```text
//!   spawn ──▶ tick (immediate first pull) ──▶ merge ──▶ publish view
//!               ▲                                  │
//!               └── poll interval ◀────────────────┘
//!   Reconnected ──▶ forced pull
//!   shutdown / handle dropped ──▶ abort in-flight pull, bump generation
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::foundation::{Clock, Timestamp, UserId};
use crate::domain::sync::{ChangeAction, EntityKind};
use crate::ports::{PullError, PullSource};

use super::merge::{LocalStore, Reconcilable};
use super::push::PushSignal;
use super::view::StreamView;

/// Tuning for one stream.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub poll_interval: Duration,
    pub pull_timeout: Duration,
    /// Consecutive background failures before one is surfaced.
    pub silent_failure_threshold: u32,
    /// Consecutive reconnect failures before the push loss is surfaced.
    pub reconnect_failure_threshold: u32,
    pub tombstone_retention: Duration,
    pub clock_skew: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            pull_timeout: Duration::from_millis(400),
            silent_failure_threshold: 5,
            reconnect_failure_threshold: 3,
            tombstone_retention: Duration::from_secs(60),
            clock_skew: Duration::from_secs(2),
        }
    }
}

/// Requests from the UI to a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerCommand {
    /// User-initiated refresh. Failures are surfaced.
    Refresh,
}

/// Failures a stream decided the user should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilerNotice {
    PullFailed {
        kind: EntityKind,
        error: PullError,
        user_initiated: bool,
        consecutive: u32,
    },
    PushUnavailable {
        kind: EntityKind,
        attempts: u32,
    },
}

/// Why a pull was started. Ordered by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PullTrigger {
    Tick,
    Reconnect,
    User,
}

struct InFlight {
    generation: u64,
    requested_at: Timestamp,
    trigger: PullTrigger,
    task: JoinHandle<()>,
}

struct PullResult<T> {
    generation: u64,
    outcome: Result<Vec<T>, PullError>,
}

/// Owner-side handle to a running stream.
///
/// Dropping the handle tears the stream down.
pub struct ReconcilerHandle<T: Reconcilable> {
    commands: mpsc::Sender<ReconcilerCommand>,
    view: watch::Receiver<StreamView<T>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<T: Reconcilable> ReconcilerHandle<T> {
    /// Asks for a user-initiated refresh.
    pub async fn refresh(&self) -> bool {
        self.commands.send(ReconcilerCommand::Refresh).await.is_ok()
    }

    /// Latest published view.
    pub fn view(&self) -> StreamView<T> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamView<T>> {
        self.view.clone()
    }

    /// Stops the stream and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::debug!(kind = %T::KIND, "Reconciler task ended abnormally: {}", e);
        }
    }
}

/// Starts a stream.
///
/// Returns the handle and the channel on which surfaced failures arrive.
pub fn spawn_stream<T: Reconcilable>(
    source: Arc<dyn PullSource<T>>,
    push: mpsc::Receiver<PushSignal>,
    clock: Arc<dyn Clock>,
    viewer: UserId,
    settings: StreamSettings,
) -> (ReconcilerHandle<T>, mpsc::Receiver<ReconcilerNotice>) {
    let now = clock.now();
    let (view_tx, view_rx) = watch::channel(StreamView::empty(now));
    let (command_tx, command_rx) = mpsc::channel(8);
    let (notice_tx, notice_rx) = mpsc::channel(16);
    let (result_tx, result_rx) = mpsc::channel(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let stream = StreamTask {
        store: LocalStore::new(to_chrono(settings.tombstone_retention)),
        source,
        clock,
        viewer,
        settings,
        view_tx,
        notices: notice_tx,
        results: result_tx,
        generation: 0,
        in_flight: None,
        queued: None,
        consecutive_failures: 0,
        last_pull_at: None,
        push_connected: true,
    };
    let task = tokio::spawn(stream.run(push, command_rx, result_rx, shutdown_rx));

    (
        ReconcilerHandle {
            commands: command_tx,
            view: view_rx,
            shutdown: shutdown_tx,
            task,
        },
        notice_rx,
    )
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

struct StreamTask<T: Reconcilable> {
    store: LocalStore<T>,
    source: Arc<dyn PullSource<T>>,
    clock: Arc<dyn Clock>,
    viewer: UserId,
    settings: StreamSettings,
    view_tx: watch::Sender<StreamView<T>>,
    notices: mpsc::Sender<ReconcilerNotice>,
    results: mpsc::Sender<PullResult<T>>,
    generation: u64,
    in_flight: Option<InFlight>,
    queued: Option<PullTrigger>,
    consecutive_failures: u32,
    last_pull_at: Option<Timestamp>,
    push_connected: bool,
}

impl<T: Reconcilable> StreamTask<T> {
    async fn run(
        mut self,
        mut push: mpsc::Receiver<PushSignal>,
        mut commands: mpsc::Receiver<ReconcilerCommand>,
        mut results: mpsc::Receiver<PullResult<T>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut push_open = true;
        let mut commands_open = true;

        tracing::debug!(kind = %T::KIND, viewer = %self.viewer, "Reconciler started");

        loop {
            tokio::select! {
                // Err means the handle was dropped.
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    self.store.prune_tombstones(self.clock.now());
                    self.request_pull(PullTrigger::Tick);
                }
                signal = push.recv(), if push_open => match signal {
                    Some(signal) => self.on_push(signal),
                    None => {
                        push_open = false;
                        self.on_push(PushSignal::Disconnected);
                    }
                },
                command = commands.recv(), if commands_open => match command {
                    Some(ReconcilerCommand::Refresh) => self.request_pull(PullTrigger::User),
                    None => commands_open = false,
                },
                Some(result) = results.recv() => self.on_pull_result(result),
            }
        }

        self.teardown();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pull edge
    // ─────────────────────────────────────────────────────────────────────

    fn request_pull(&mut self, trigger: PullTrigger) {
        if self.in_flight.is_none() {
            self.start_pull(trigger);
            return;
        }
        // A tick during a pull is skipped; the next one will come.
        if trigger > PullTrigger::Tick {
            self.queued = self.queued.max(Some(trigger));
        }
    }

    fn start_pull(&mut self, trigger: PullTrigger) {
        self.generation += 1;
        let generation = self.generation;
        let source = Arc::clone(&self.source);
        let results = self.results.clone();
        let timeout = self.settings.pull_timeout;

        let task = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, source.fetch()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(PullError::Timeout),
            };
            // Receiver gone means the stream was torn down.
            let _ = results.send(PullResult { generation, outcome }).await;
        });

        self.in_flight = Some(InFlight {
            generation,
            requested_at: self.clock.now(),
            trigger,
            task,
        });
    }

    fn on_pull_result(&mut self, result: PullResult<T>) {
        let current = self.in_flight.as_ref().map(|f| f.generation);
        if current != Some(result.generation) {
            tracing::debug!(kind = %T::KIND, generation = result.generation, "Discarding superseded pull");
            return;
        }
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        match result.outcome {
            Ok(items) => {
                let now = self.clock.now();
                let merge = self.store.apply_pull(
                    items,
                    in_flight.requested_at,
                    to_chrono(self.settings.clock_skew),
                    now,
                );
                self.consecutive_failures = 0;
                self.last_pull_at = Some(now);
                tracing::debug!(
                    kind = %T::KIND,
                    inserted = merge.inserted,
                    replaced = merge.replaced,
                    removed = merge.removed,
                    stale = merge.stale,
                    "Pull merged"
                );
                self.publish_view();
            }
            Err(error) => self.on_pull_failure(error, in_flight.trigger),
        }

        if let Some(next) = self.queued.take() {
            self.start_pull(next);
        }
    }

    fn on_pull_failure(&mut self, error: PullError, trigger: PullTrigger) {
        self.consecutive_failures += 1;
        let consecutive = self.consecutive_failures;
        let user_initiated = trigger == PullTrigger::User;

        if user_initiated {
            tracing::info!(kind = %T::KIND, "Refresh failed: {}", error);
        } else if consecutive == self.settings.silent_failure_threshold {
            tracing::warn!(kind = %T::KIND, consecutive, "Background pull keeps failing: {}", error);
        } else {
            tracing::debug!(kind = %T::KIND, consecutive, "Background pull failed: {}", error);
            return;
        }

        self.notify(ReconcilerNotice::PullFailed {
            kind: T::KIND,
            error,
            user_initiated,
            consecutive,
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Push edge
    // ─────────────────────────────────────────────────────────────────────

    fn on_push(&mut self, signal: PushSignal) {
        match signal {
            PushSignal::Change { action, state } => {
                let Some(entity) = T::from_state(state) else {
                    tracing::debug!(kind = %T::KIND, "Ignoring change for another kind");
                    return;
                };
                let now = self.clock.now();
                let changed = if action == ChangeAction::Delete {
                    self.store.remove(&entity.key(), entity.version(), now)
                } else {
                    self.store.upsert(entity, now).changed()
                };
                if changed {
                    self.publish_view();
                }
            }
            PushSignal::Disconnected => {
                if self.push_connected {
                    tracing::debug!(kind = %T::KIND, "Push channel lost, polling only");
                    self.push_connected = false;
                    self.publish_view();
                }
            }
            PushSignal::Reconnected => {
                tracing::debug!(kind = %T::KIND, "Push channel restored, forcing pull");
                self.push_connected = true;
                self.request_pull(PullTrigger::Reconnect);
                self.publish_view();
            }
            PushSignal::ReconnectFailed { attempts } => {
                if attempts == self.settings.reconnect_failure_threshold {
                    tracing::warn!(kind = %T::KIND, attempts, "Push channel unavailable");
                    self.notify(ReconcilerNotice::PushUnavailable {
                        kind: T::KIND,
                        attempts,
                    });
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────────────

    fn publish_view(&self) {
        let view = StreamView::build(
            &self.store,
            &self.viewer,
            self.clock.now(),
            self.last_pull_at,
            self.push_connected,
        );
        self.view_tx.send_replace(view);
    }

    fn notify(&self, notice: ReconcilerNotice) {
        if let Err(e) = self.notices.try_send(notice) {
            tracing::debug!(kind = %T::KIND, "Notice dropped: {}", e);
        }
    }

    fn teardown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
        // Anything still landing is from an older generation.
        self.generation += 1;
        tracing::debug!(kind = %T::KIND, viewer = %self.viewer, "Reconciler stopped");
    }
}
