use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

/// One book's line at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineObservation {
    pub book: String,
    pub line: f64,
    pub timestamp: DateTime<Utc>,
}

/// Time-ordered line observations for one `(sport, event, market)`.
///
/// Observations are kept sorted by timestamp on insert, so the front is
/// always the oldest surviving line and the back the newest.
#[derive(Debug, Clone, Default)]
pub struct LineHistory {
    observations: VecDeque<LineObservation>,
}

impl LineHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert in timestamp order. Late arrivals slot in behind any
    /// observation with the same timestamp.
    pub fn push(&mut self, observation: LineObservation) {
        let at = self
            .observations
            .partition_point(|o| o.timestamp <= observation.timestamp);
        self.observations.insert(at, observation);
    }

    /// Drop observations older than `window` before `now`. Returns how many
    /// were removed.
    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let cutoff = now - window;
        let before = self.observations.len();
        while let Some(front) = self.observations.front() {
            if front.timestamp >= cutoff {
                break;
            }
            self.observations.pop_front();
        }
        before - self.observations.len()
    }

    pub fn earliest(&self) -> Option<&LineObservation> {
        self.observations.front()
    }

    pub fn latest(&self) -> Option<&LineObservation> {
        self.observations.back()
    }

    /// Seconds between the oldest and newest observation.
    pub fn span_secs(&self) -> f64 {
        match (self.earliest(), self.latest()) {
            (Some(first), Some(last)) => {
                (last.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0
            }
            _ => 0.0,
        }
    }

    pub fn distinct_books(&self) -> usize {
        self.observations
            .iter()
            .map(|o| o.book.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LineObservation> {
        self.observations.iter()
    }
}
