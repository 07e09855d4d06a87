//! Per-tick idempotency guard

use crate::Tick;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Remembers which ticks already ran a guarded action
///
/// During resimulation the same tick is simulated once per replay pass. A
/// side effect that must not repeat (spawning a projectile, playing a sound)
/// checks `can_process` and then calls `acknowledge_tick`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnceFlag {
    processed: BTreeSet<Tick>,
}

impl OnceFlag {
    /// Create an empty flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the guarded action has not yet run for this tick
    pub fn can_process(&self, tick: Tick) -> bool {
        !self.processed.contains(&tick)
    }

    /// Record that the guarded action ran for this tick
    pub fn acknowledge_tick(&mut self, tick: Tick) {
        self.processed.insert(tick);
    }

    /// Check and acknowledge in one step
    ///
    /// Returns `true` exactly once per tick.
    pub fn try_process(&mut self, tick: Tick) -> bool {
        self.processed.insert(tick)
    }

    /// Drop bookkeeping for ticks older than `tick`
    ///
    /// Ticks outside the history window can never be replayed again.
    pub fn forget_before(&mut self, tick: Tick) {
        self.processed = self.processed.split_off(&tick);
    }

    /// Number of acknowledged ticks still remembered
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    /// Check if no tick has been acknowledged
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}
