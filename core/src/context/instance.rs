//! Instance-level metadata served next to the event pages.

use serde::Deserialize;

use crate::combat_log::Timestamp;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstanceMeta {
    pub instance_meta_id: u64,
    #[serde(default)]
    pub map_id: u32,
    #[serde(default)]
    pub start_ts: Timestamp,
    /// Advances while the instance is still being recorded
    #[serde(default)]
    pub end_ts: Option<Timestamp>,
    /// No further data will arrive
    #[serde(default)]
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Participant {
    pub character_id: u64,
    pub name: String,
    #[serde(default)]
    pub hero_class_id: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Attempt {
    pub attempt_id: u64,
    #[serde(default)]
    pub encounter_id: u32,
    pub start_ts: Timestamp,
    pub end_ts: Timestamp,
    #[serde(default)]
    pub is_kill: bool,
}

/// A contiguous combat window, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptInterval {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl AttemptInterval {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

impl From<&Attempt> for AttemptInterval {
    fn from(attempt: &Attempt) -> Self {
        Self::new(attempt.start_ts, attempt.end_ts)
    }
}

/// True iff `timestamp` falls inside at least one interval
pub fn in_any_interval(intervals: &[AttemptInterval], timestamp: Timestamp) -> bool {
    intervals.iter().any(|interval| interval.contains(timestamp))
}

/// Total covered duration, starting at 1 so consumers can divide by it
pub fn total_duration(intervals: &[AttemptInterval]) -> u64 {
    intervals
        .iter()
        .fold(1, |acc, interval| acc + interval.duration())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_bounds_are_inclusive() {
        let interval = AttemptInterval::new(10, 20);
        assert!(interval.contains(10));
        assert!(interval.contains(15));
        assert!(interval.contains(20));
        assert!(!interval.contains(9));
        assert!(!interval.contains(21));
    }

    #[test]
    fn membership_in_any_interval() {
        let intervals = [AttemptInterval::new(0, 5), AttemptInterval::new(100, 200)];
        assert!(in_any_interval(&intervals, 5));
        assert!(in_any_interval(&intervals, 150));
        assert!(!in_any_interval(&intervals, 50));
        assert!(!in_any_interval(&[], 0));
    }

    #[test]
    fn total_duration_starts_at_one() {
        assert_eq!(total_duration(&[]), 1);
        let intervals = [AttemptInterval::new(0, 5), AttemptInterval::new(100, 200)];
        assert_eq!(total_duration(&intervals), 106);
    }

    #[test]
    fn interval_from_attempt() {
        let attempt = Attempt {
            attempt_id: 1,
            encounter_id: 7,
            start_ts: 1_000,
            end_ts: 2_000,
            is_kill: true,
        };
        assert_eq!(AttemptInterval::from(&attempt), AttemptInterval::new(1_000, 2_000));
    }
}
