//! Synchronization tuning: push channel buffering and reconciler cadence.

use serde::Deserialize;
use std::time::Duration;

use crate::client::{ReconnectBackoff, StreamSettings};
use crate::domain::sync::EntityKind;

use super::error::ValidationError;

/// Sync configuration
///
/// All durations are in milliseconds so they can be set from plain
/// environment variables, e.g. `PATROL_SYNC__SYNC__SCHEDULES_POLL_MS=60000`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Outbound messages buffered per connection before deliveries drop.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_messages_poll")]
    pub messages_poll_ms: u64,

    #[serde(default = "default_messages_poll")]
    pub conversations_poll_ms: u64,

    #[serde(default = "default_notifications_poll")]
    pub notifications_poll_ms: u64,

    #[serde(default = "default_vehicle_requests_poll")]
    pub vehicle_requests_poll_ms: u64,

    #[serde(default = "default_vehicles_poll")]
    pub vehicles_poll_ms: u64,

    #[serde(default = "default_schedules_poll")]
    pub schedules_poll_ms: u64,

    /// Must be below the shortest poll interval.
    #[serde(default = "default_pull_timeout")]
    pub pull_timeout_ms: u64,

    /// Consecutive background pull failures before one is shown.
    #[serde(default = "default_silent_failure_threshold")]
    pub silent_failure_threshold: u32,

    /// Consecutive reconnect failures before the push loss is shown.
    #[serde(default = "default_reconnect_failure_threshold")]
    pub reconnect_failure_threshold: u32,

    /// First wait after a failed push reconnect. Doubles per failure.
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,

    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_ms: u64,

    #[serde(default = "default_tombstone_retention")]
    pub tombstone_retention_ms: u64,

    /// Tolerated difference between client and server clocks.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_ms: u64,
}

impl SyncConfig {
    pub fn poll_interval(&self, kind: EntityKind) -> Duration {
        let ms = match kind {
            EntityKind::Message => self.messages_poll_ms,
            EntityKind::Conversation => self.conversations_poll_ms,
            EntityKind::Notification => self.notifications_poll_ms,
            EntityKind::VehicleRequest => self.vehicle_requests_poll_ms,
            EntityKind::Vehicle => self.vehicles_poll_ms,
            EntityKind::Schedule => self.schedules_poll_ms,
        };
        Duration::from_millis(ms)
    }

    /// Reconciler settings for one stream.
    pub fn stream_settings(&self, kind: EntityKind) -> StreamSettings {
        StreamSettings {
            poll_interval: self.poll_interval(kind),
            pull_timeout: Duration::from_millis(self.pull_timeout_ms),
            silent_failure_threshold: self.silent_failure_threshold,
            reconnect_failure_threshold: self.reconnect_failure_threshold,
            tombstone_retention: Duration::from_millis(self.tombstone_retention_ms),
            clock_skew: Duration::from_millis(self.clock_skew_ms),
        }
    }

    pub fn reconnect_backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff {
            initial: Duration::from_millis(self.reconnect_initial_ms),
            max: Duration::from_millis(self.reconnect_max_ms),
        }
    }

    /// Validate sync configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel_capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }

        let intervals = [
            ("messages", self.messages_poll_ms),
            ("conversations", self.conversations_poll_ms),
            ("notifications", self.notifications_poll_ms),
            ("vehicle requests", self.vehicle_requests_poll_ms),
            ("vehicles", self.vehicles_poll_ms),
            ("schedules", self.schedules_poll_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(ValidationError::InvalidPollInterval(name));
        }

        let shortest = intervals.iter().map(|(_, ms)| *ms).min().unwrap_or(0);
        if self.pull_timeout_ms == 0 || self.pull_timeout_ms >= shortest {
            return Err(ValidationError::PullTimeoutTooLong(shortest));
        }

        if self.silent_failure_threshold == 0 {
            return Err(ValidationError::InvalidThreshold("silent_failure_threshold"));
        }
        if self.reconnect_failure_threshold == 0 {
            return Err(ValidationError::InvalidThreshold("reconnect_failure_threshold"));
        }
        if self.reconnect_initial_ms == 0 || self.reconnect_max_ms < self.reconnect_initial_ms {
            return Err(ValidationError::InvalidBackoff);
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            messages_poll_ms: default_messages_poll(),
            conversations_poll_ms: default_messages_poll(),
            notifications_poll_ms: default_notifications_poll(),
            vehicle_requests_poll_ms: default_vehicle_requests_poll(),
            vehicles_poll_ms: default_vehicles_poll(),
            schedules_poll_ms: default_schedules_poll(),
            pull_timeout_ms: default_pull_timeout(),
            silent_failure_threshold: default_silent_failure_threshold(),
            reconnect_failure_threshold: default_reconnect_failure_threshold(),
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_ms: default_reconnect_max(),
            tombstone_retention_ms: default_tombstone_retention(),
            clock_skew_ms: default_clock_skew(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

fn default_messages_poll() -> u64 {
    500
}

fn default_notifications_poll() -> u64 {
    5_000
}

fn default_vehicle_requests_poll() -> u64 {
    5_000
}

fn default_vehicles_poll() -> u64 {
    10_000
}

fn default_schedules_poll() -> u64 {
    30_000
}

fn default_pull_timeout() -> u64 {
    400
}

fn default_silent_failure_threshold() -> u32 {
    5
}

fn default_reconnect_failure_threshold() -> u32 {
    3
}

fn default_reconnect_initial() -> u64 {
    500
}

fn default_reconnect_max() -> u64 {
    30_000
}

fn default_tombstone_retention() -> u64 {
    60_000
}

fn default_clock_skew() -> u64 {
    2_000
}
