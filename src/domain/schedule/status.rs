//! Time-derived schedule status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Timestamp;

/// Status of a patrol shift relative to wall-clock time.
///
/// Never transitioned explicitly: always the output of [`compute_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl ScheduleStatus {
    /// Time fields may only change while the shift has not started.
    pub fn is_mutable(&self) -> bool {
        matches!(self, ScheduleStatus::Upcoming)
    }

    /// A running shift can never be deleted.
    pub fn is_deletable(&self) -> bool {
        !matches!(self, ScheduleStatus::Ongoing)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleStatus::Upcoming => "Upcoming",
            ScheduleStatus::Ongoing => "Ongoing",
            ScheduleStatus::Completed => "Completed",
        };
        write!(f, "{}", s)
    }
}

/// Derives a shift's status from the current instant.
///
/// Both boundary instants are inclusive of `Ongoing`: a shift is running at
/// exactly `start` and still running at exactly `end`.
pub fn compute_status(now: Timestamp, start: Timestamp, end: Timestamp) -> ScheduleStatus {
    if now < start {
        ScheduleStatus::Upcoming
    } else if now <= end {
        ScheduleStatus::Ongoing
    } else {
        ScheduleStatus::Completed
    }
}

/// Kind of patrol shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftKind {
    Day,
    Night,
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftKind::Day => write!(f, "day"),
            ShiftKind::Night => write!(f, "night"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: i64 = 1_705_276_800;
    const NINE_HOURS: i64 = 9 * 3600;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs)
    }

    #[test]
    fn one_second_before_start_is_upcoming() {
        assert_eq!(
            compute_status(at(T - 1), at(T), at(T + NINE_HOURS)),
            ScheduleStatus::Upcoming
        );
    }

    #[test]
    fn exactly_start_is_ongoing() {
        assert_eq!(
            compute_status(at(T), at(T), at(T + NINE_HOURS)),
            ScheduleStatus::Ongoing
        );
    }

    #[test]
    fn exactly_end_is_ongoing() {
        assert_eq!(
            compute_status(at(T + NINE_HOURS), at(T), at(T + NINE_HOURS)),
            ScheduleStatus::Ongoing
        );
    }

    #[test]
    fn one_second_after_end_is_completed() {
        assert_eq!(
            compute_status(at(T + NINE_HOURS + 1), at(T), at(T + NINE_HOURS)),
            ScheduleStatus::Completed
        );
    }

    #[test]
    fn only_upcoming_is_mutable() {
        assert!(ScheduleStatus::Upcoming.is_mutable());
        assert!(!ScheduleStatus::Ongoing.is_mutable());
        assert!(!ScheduleStatus::Completed.is_mutable());
    }

    #[test]
    fn ongoing_is_not_deletable() {
        assert!(ScheduleStatus::Upcoming.is_deletable());
        assert!(!ScheduleStatus::Ongoing.is_deletable());
        assert!(ScheduleStatus::Completed.is_deletable());
    }

    #[test]
    fn serializes_to_snake_case_json() {
        assert_eq!(
            serde_json::to_string(&ScheduleStatus::Ongoing).unwrap(),
            "\"ongoing\""
        );
    }

    proptest! {
        #[test]
        fn status_matches_three_way_comparison(
            now in -1_000_000i64..1_000_000,
            start in -1_000_000i64..1_000_000,
            len in 0i64..100_000,
        ) {
            let end = start + len;
            let status = compute_status(at(now), at(start), at(end));
            let expected = if now < start {
                ScheduleStatus::Upcoming
            } else if now <= end {
                ScheduleStatus::Ongoing
            } else {
                ScheduleStatus::Completed
            };
            prop_assert_eq!(status, expected);
        }

        #[test]
        fn status_never_moves_backwards_in_time(
            now in -1_000_000i64..1_000_000,
            step in 0i64..10_000,
            start in -1_000_000i64..1_000_000,
            len in 0i64..100_000,
        ) {
            let rank = |s: ScheduleStatus| match s {
                ScheduleStatus::Upcoming => 0,
                ScheduleStatus::Ongoing => 1,
                ScheduleStatus::Completed => 2,
            };
            let end = start + len;
            let earlier = compute_status(at(now), at(start), at(end));
            let later = compute_status(at(now + step), at(start), at(end));
            prop_assert!(rank(earlier) <= rank(later));
        }
    }
}
