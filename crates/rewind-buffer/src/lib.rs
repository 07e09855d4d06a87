//! Rewind Buffer - Tick-indexed ring buffer for rewind history
//!
//! This crate provides the fixed-capacity history log that every rewindable
//! input and state keeps.
//!
//! # Features
//!
//! - **Bounded memory**: Fixed-size ring buffer, no unbounded growth
//! - **O(1) writes**: Writing the latest tick or any retained tick is constant time
//! - **Explicit gaps**: Skipped ticks are stored as absent, never invented
//! - **Clamped reads**: Reads never fail inside a replay loop
//!
//! # Read and write policy
//!
//! - Reading a tick newer than the latest written tick returns the latest tick.
//! - Reading a tick that is absent, or older than the window, walks back to
//!   the nearest older present tick, and falls back to the default value.
//! - Writing a tick older than the window fails with [`Error::StaleWrite`];
//!   the caller drops the write. History is never rewritten from outside the
//!   window.
//!
//! # Example
//!
//! ```rust
//! use rewind_buffer::TickHistoryBuffer;
//!
//! // 8 ticks of history, starting at tick 10
//! let mut buffer = TickHistoryBuffer::<i32>::new(8, 10);
//!
//! buffer.set(100, 10).unwrap();
//! buffer.set(130, 13).unwrap(); // ticks 11 and 12 become explicit gaps
//!
//! assert_eq!(*buffer.get(13), 130);
//! assert_eq!(*buffer.get(12), 100); // gap resolves to the nearest older value
//! assert_eq!(*buffer.get(99), 130); // future reads clamp to the latest tick
//! assert!(buffer.get_exact(12).is_none());
//! ```

mod error;

pub use error::{Error, Result};

use rewind_core::{Tick, DEFAULT_HISTORY_SIZE};
use serde::{Deserialize, Serialize};

/// A ring buffer mapping ticks to snapshots
///
/// The slot for tick `t` is `(head - (latest_tick - t)) mod capacity`, valid
/// while `latest_tick - t < capacity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickHistoryBuffer<T> {
    /// Ring storage; `None` marks an absent tick
    slots: Vec<Option<T>>,
    /// Highest tick ever written or skipped over
    latest_tick: Tick,
    /// Slot holding `latest_tick`
    head: usize,
    /// Returned when no present tick can be found
    default_value: T,
}

impl<T> TickHistoryBuffer<T> {
    /// Create an empty buffer with an explicit fallback value
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of ticks retained (typically 32-128)
    /// * `starting_tick` - Tick considered the latest one before any write
    /// * `default_value` - Returned by reads that find no present tick
    pub fn with_default_value(capacity: usize, starting_tick: Tick, default_value: T) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            latest_tick: starting_tick,
            head: 0,
            default_value,
        }
    }

    /// Number of ticks retained
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Highest tick the buffer has advanced to
    pub fn latest_tick(&self) -> Tick {
        self.latest_tick
    }

    /// Oldest tick still inside the window, present or not
    pub fn oldest_tick(&self) -> Tick {
        self.latest_tick.saturating_sub(self.capacity() as Tick - 1)
    }

    /// Value returned when no present tick is found
    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Replace the fallback value
    pub fn set_default_value(&mut self, value: T) {
        self.default_value = value;
    }

    /// Slot index for a tick `offset` ticks behind the head
    fn slot_index(&self, offset: usize) -> usize {
        let capacity = self.capacity();
        (self.head + capacity - offset) % capacity
    }

    /// Offset behind the head, if the tick is inside the window
    ///
    /// Ticks so far back that the distance overflows are outside it too.
    fn offset_of(&self, tick: Tick) -> Option<usize> {
        if tick > self.latest_tick {
            return None;
        }
        let offset = self.latest_tick.checked_sub(tick)?;
        if offset >= self.capacity() as Tick {
            None
        } else {
            Some(offset as usize)
        }
    }

    fn advance(&mut self) {
        self.head = (self.head + 1) % self.capacity();
        self.latest_tick += 1;
    }

    /// Append a value at `latest_tick + 1`
    pub fn push(&mut self, value: T) {
        self.advance();
        self.slots[self.head] = Some(value);
    }

    /// Advance to `latest_tick + 1` without a value
    pub fn push_empty(&mut self) {
        self.advance();
        self.slots[self.head] = None;
    }

    /// Write a value at an arbitrary tick
    ///
    /// - Newer than the latest tick: advances, marking skipped ticks absent.
    /// - Inside the window: overwrites that tick.
    /// - Older than the window: returns [`Error::StaleWrite`] and changes nothing.
    pub fn set(&mut self, value: T, tick: Tick) -> Result<()> {
        if tick > self.latest_tick {
            let far = tick
                .checked_sub(self.latest_tick)
                .map_or(true, |gap| gap > self.capacity() as Tick);
            if far {
                // Every retained tick would be skipped over
                for slot in self.slots.iter_mut() {
                    *slot = None;
                }
                self.latest_tick = tick - 1;
            } else {
                while self.latest_tick < tick - 1 {
                    self.push_empty();
                }
            }
            self.push(value);
            return Ok(());
        }

        match self.offset_of(tick) {
            Some(offset) => {
                let index = self.slot_index(offset);
                self.slots[index] = Some(value);
                Ok(())
            }
            None => Err(Error::StaleWrite {
                tick,
                oldest: self.oldest_tick(),
            }),
        }
    }

    /// Read the value for a tick, clamping as described in the crate docs
    pub fn get(&self, tick: Tick) -> &T {
        let tick = tick.min(self.latest_tick);
        let capacity = self.capacity();
        let start = self
            .latest_tick
            .checked_sub(tick)
            .map_or(capacity - 1, |offset| offset.min(capacity as Tick - 1) as usize);

        (start..capacity)
            .find_map(|offset| self.slots[self.slot_index(offset)].as_ref())
            .unwrap_or(&self.default_value)
    }

    /// Read the value stored at exactly this tick, if present
    pub fn get_exact(&self, tick: Tick) -> Option<&T> {
        let offset = self.offset_of(tick)?;
        self.slots[self.slot_index(offset)].as_ref()
    }

    /// Check if a value is stored at exactly this tick
    pub fn contains(&self, tick: Tick) -> bool {
        self.get_exact(tick).is_some()
    }

    /// Newest tick holding a value
    pub fn latest_known_tick(&self) -> Option<Tick> {
        (0..self.capacity())
            .find(|offset| self.slots[self.slot_index(*offset)].is_some())
            .map(|offset| self.latest_tick - offset as Tick)
    }

    /// Oldest tick holding a value
    pub fn earliest_known_tick(&self) -> Option<Tick> {
        (0..self.capacity())
            .rev()
            .find(|offset| self.slots[self.slot_index(*offset)].is_some())
            .map(|offset| self.latest_tick - offset as Tick)
    }

    /// Iterate over present values, oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = (Tick, &T)> {
        (0..self.capacity()).rev().filter_map(move |offset| {
            self.slots[self.slot_index(offset)]
                .as_ref()
                .map(|value| (self.latest_tick - offset as Tick, value))
        })
    }

    /// Number of present values
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Check if no value is present
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    /// Mark every tick absent, keeping the latest tick
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    /// Get statistics about the buffer
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            capacity: self.capacity(),
            count: self.len(),
            latest_tick: self.latest_tick,
            earliest_known: self.earliest_known_tick(),
            latest_known: self.latest_known_tick(),
        }
    }
}

impl<T: Default> TickHistoryBuffer<T> {
    /// Create an empty buffer falling back to `T::default()`
    pub fn new(capacity: usize, starting_tick: Tick) -> Self {
        Self::with_default_value(capacity, starting_tick, T::default())
    }
}

impl<T: Clone> TickHistoryBuffer<T> {
    /// Create a buffer with every retained tick holding `value`
    ///
    /// Used when an object becomes active, so that early reads and rewinds to
    /// before its activation never hit an absent tick.
    pub fn backfilled(capacity: usize, starting_tick: Tick, value: T) -> Self {
        let mut buffer = Self::with_default_value(capacity, starting_tick, value.clone());
        for slot in buffer.slots.iter_mut() {
            *slot = Some(value.clone());
        }
        buffer
    }
}

impl<T: Default> Default for TickHistoryBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE, 0)
    }
}

/// Statistics about a history buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Maximum capacity
    pub capacity: usize,
    /// Number of present values
    pub count: usize,
    /// Highest tick the buffer has advanced to
    pub latest_tick: Tick,
    /// Oldest tick holding a value
    pub earliest_known: Option<Tick>,
    /// Newest tick holding a value
    pub latest_known: Option<Tick>,
}

impl BufferStats {
    /// Span between the oldest and newest present values
    pub fn known_span(&self) -> Tick {
        match (self.earliest_known, self.latest_known) {
            (Some(earliest), Some(latest)) => latest - earliest,
            _ => 0,
        }
    }

    /// Get the fill percentage (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f32 {
        self.count as f32 / self.capacity as f32
    }
}
