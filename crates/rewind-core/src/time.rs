//! Time system for fixed-rate simulation
//!
//! - `Tick` - One fixed-duration simulation step
//! - `TickRange` - Inclusive span of ticks, used for replay windows
//! - `FixedClock` - Fixed-rate tick source driving the rewind manager

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete, monotonically increasing tick identifier
///
/// Signed so that "the tick before the first one" (`tick - 1`) and display
/// ticks lagging behind tick zero stay representable.
pub type Tick = i64;

/// Inclusive range of ticks `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRange {
    pub from: Tick,
    pub to: Tick,
}

impl TickRange {
    /// Create a new range; `from > to` yields an empty range
    pub fn new(from: Tick, to: Tick) -> Self {
        Self { from, to }
    }

    /// A range covering exactly one tick
    pub fn single(tick: Tick) -> Self {
        Self::new(tick, tick)
    }

    /// Number of ticks in the range
    pub fn len(&self) -> usize {
        if self.from > self.to {
            0
        } else {
            (self.to - self.from + 1) as usize
        }
    }

    /// Check if the range is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a tick lies within the range
    pub fn contains(&self, tick: Tick) -> bool {
        tick >= self.from && tick <= self.to
    }

    /// Iterate over the ticks in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Tick> {
        self.from..=self.to
    }
}

impl fmt::Display for TickRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Fixed-rate simulation clock
///
/// The rewind manager never owns time; it is handed the current tick and the
/// fixed delta by whoever drives the loop. This clock is that driver for
/// headless loops and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedClock {
    /// Current tick number
    tick: Tick,
    /// Ticks per second
    tick_rate: u32,
}

impl FixedClock {
    /// Create a clock starting at tick zero
    pub fn new(tick_rate: u32) -> Self {
        Self::starting_at(0, tick_rate)
    }

    /// Create a clock starting at a specific tick
    pub fn starting_at(tick: Tick, tick_rate: u32) -> Self {
        Self {
            tick,
            tick_rate: tick_rate.max(1),
        }
    }

    /// Current tick
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Ticks per second
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Seconds per tick
    pub fn delta(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Simulation time at the start of the given tick, in seconds
    pub fn time_at(&self, tick: Tick) -> f64 {
        tick as f64 / self.tick_rate as f64
    }

    /// Advance to the next tick and return it
    pub fn advance(&mut self) -> Tick {
        self.tick += 1;
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock() {
        let mut clock = FixedClock::new(50);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.tick(), 1);
        assert!((clock.delta() - 0.02).abs() < f32::EPSILON);
        assert!((clock.time_at(100) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clock_rate_never_zero() {
        let clock = FixedClock::starting_at(-3, 0);
        assert_eq!(clock.tick_rate(), 1);
        assert_eq!(clock.tick(), -3);
    }

    #[test]
    fn test_tick_range() {
        let range = TickRange::new(6, 11);
        assert_eq!(range.len(), 6);
        assert!(range.contains(6));
        assert!(range.contains(11));
        assert!(!range.contains(12));
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![6, 7, 8, 9, 10, 11]);
        assert_eq!(range.to_string(), "6 -> 11");

        assert!(TickRange::new(5, 4).is_empty());
        assert_eq!(TickRange::single(3).len(), 1);
    }
}
