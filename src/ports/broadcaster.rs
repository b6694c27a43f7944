//! Broadcaster port - fan-out of change envelopes to rooms.
//!
//! The application layer publishes through this port without knowing how
//! subscribers are connected. Delivery is at-most-once per handle: a
//! handle that joins after a publish does not see it, and a handle whose
//! connection is gone or saturated is skipped.

use async_trait::async_trait;

use crate::domain::sync::{ChangeEnvelope, Room};

/// Outcome of a single publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Handles that accepted the envelope.
    pub delivered: usize,
    /// Handles that were in the room but could not take it.
    pub dropped: usize,
}

impl DeliveryReport {
    pub fn merge(self, other: DeliveryReport) -> Self {
        Self {
            delivered: self.delivered + other.delivered,
            dropped: self.dropped + other.dropped,
        }
    }
}

/// Port for publishing envelopes to every handle in a room.
///
/// Publishing never fails from the caller's point of view; undeliverable
/// copies are counted in the returned report and otherwise ignored.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn publish(&self, room: &Room, envelope: ChangeEnvelope) -> DeliveryReport;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn Broadcaster) {}

    #[test]
    fn reports_merge_by_summing() {
        let a = DeliveryReport {
            delivered: 2,
            dropped: 1,
        };
        let b = DeliveryReport {
            delivered: 3,
            dropped: 0,
        };
        assert_eq!(
            a.merge(b),
            DeliveryReport {
                delivered: 5,
                dropped: 1
            }
        );
    }
}
