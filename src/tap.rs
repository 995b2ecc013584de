use std::time::{Duration, Instant};

use crate::Coordinate;

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum RawEventKind {
    Press,
    Release,
}

/// A press or release as reported by the transport, before any classification.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct RawEvent {
    pub coordinate: Coordinate,
    pub kind: RawEventKind,
    /// Arrival time of the event
    pub time: Instant,
}

impl RawEvent {
    pub fn press(coordinate: Coordinate, time: Instant) -> Self {
        Self {
            coordinate,
            kind: RawEventKind::Press,
            time,
        }
    }

    pub fn release(coordinate: Coordinate, time: Instant) -> Self {
        Self {
            coordinate,
            kind: RawEventKind::Release,
            time,
        }
    }

    pub fn is_press(&self) -> bool {
        self.kind == RawEventKind::Press
    }
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TapKind {
    Single,
    Double,
}

/// A classified gesture. Only ever produced by the tap classifier.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct Tap {
    pub coordinate: Coordinate,
    /// When the release that opened the decision window arrived
    pub observed_time: Instant,
    /// When the decision window closed and the tap was classified
    pub decision_time: Instant,
    pub kind: TapKind,
    /// Time between the last qualifying press and its release. Informational only
    pub hold_duration: Duration,
    /// Number of releases seen in the window. Anything above 2 is still reported as a
    /// [`TapKind::Double`]; this is where the extra hits stay visible.
    pub hits: u32,
}

impl Tap {
    /// Time from the first release to the classification
    pub fn latency(&self) -> Duration {
        self.decision_time.saturating_duration_since(self.observed_time)
    }
}
