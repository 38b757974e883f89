//! Processing Clock
//!
//! The single clock driving a Processing run: progress ticks at a fixed
//! interval, then one resolution at a fixed deadline.

use std::time::Duration;

/// What the clock emits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockEvent {
    Tick,
    Resolve,
}

/// Timing of one Processing run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockSchedule {
    /// Interval between progress ticks
    pub tick_interval: Duration,

    /// Offset of the resolution event from the start of Processing
    pub resolve_after: Duration,
}

impl Default for ClockSchedule {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            resolve_after: Duration::from_millis(2500),
        }
    }
}

impl ClockSchedule {
    /// Every event with its offset from the start, in firing order.
    ///
    /// Ticks fire strictly before the deadline; `Resolve` is always last.
    pub fn events(&self) -> Vec<(Duration, ClockEvent)> {
        let mut events = Vec::new();

        if !self.tick_interval.is_zero() {
            let mut at = self.tick_interval;
            while at < self.resolve_after {
                events.push((at, ClockEvent::Tick));
                at += self.tick_interval;
            }
        }

        events.push((self.resolve_after, ClockEvent::Resolve));
        events
    }

    /// Number of ticks before resolution
    pub fn tick_count(&self) -> usize {
        self.events().len() - 1
    }
}
