//! Capability contracts for rewindable facets
//!
//! Two layers live here:
//! - [`RewindableInput`] and [`RewindableState`] are object-safe and are what
//!   the manager drives. They traffic in ticks and opaque payload bytes.
//! - [`InputBinding`], [`StateBinding`] and [`Behaviour`] are the typed
//!   traits game code implements. [`InputTrack`](crate::InputTrack),
//!   [`StateTrack`](crate::StateTrack) and
//!   [`BehaviourTrack`](crate::BehaviourTrack) adapt them to the first layer
//!   by owning the history buffer and the payload codec.

use crate::{Result, Step};
use rewind_core::Tick;
use serde::{de::DeserializeOwned, Serialize};

/// Per-tick input history of one object
pub trait RewindableInput<W> {
    /// Whether this peer samples the input
    fn is_own(&self) -> bool;

    /// Reset history at registration time
    fn activate(&mut self, world: &W, tick: Tick, history_size: usize);

    /// Sample the live input and store it for `tick`
    fn save_input(&mut self, world: &W, tick: Tick);

    /// Apply the input stored for `tick` to the world
    fn restore_input(&mut self, world: &mut W, tick: Tick);

    /// Payload of the input stored for `tick`
    fn encode_input(&self, tick: Tick) -> Result<Vec<u8>>;

    /// Store a received input for `tick`
    fn handle_commit(&mut self, tick: Tick, payload: &[u8]) -> Result<()>;

    /// Reset the received-input watermark
    fn acknowledge_inputs(&mut self);

    /// Earliest tick stored since the last acknowledgement
    fn earliest_received_input(&self) -> Option<Tick>;

    /// Whether anything was stored since the last acknowledgement
    fn has_new_input(&self) -> bool {
        self.earliest_received_input().is_some()
    }

    /// Newest tick for which an input is known
    fn latest_known_input(&self) -> Option<Tick>;

    /// Whether the input for `tick` is known rather than extrapolated
    fn covers(&self, tick: Tick) -> bool {
        self.latest_known_input().is_some_and(|latest| tick <= latest)
    }
}

/// Per-tick state history of one object
pub trait RewindableState<W> {
    /// Whether this peer predicts the state
    fn is_own(&self) -> bool;

    /// Reset history at registration time, backfilled from the live world
    fn activate(&mut self, world: &W, tick: Tick, history_size: usize);

    /// Capture the live state and store it for `tick`
    fn save_state(&mut self, world: &W, tick: Tick);

    /// Write the state stored for `tick` into the world
    fn restore_state(&mut self, world: &mut W, tick: Tick);

    /// Advance the world by one tick
    fn simulate(&mut self, world: &mut W, step: &mut Step<'_, W>);

    /// Payload of the state stored for `tick`
    fn encode_state(&self, tick: Tick) -> Result<Vec<u8>>;

    /// Store an authoritative state for `tick`
    fn handle_commit(&mut self, tick: Tick, payload: &[u8]) -> Result<()>;

    /// Reset the received-state watermark
    fn acknowledge_states(&mut self);

    /// Newest authoritative tick received since the last acknowledgement
    fn latest_received_state(&self) -> Option<Tick>;

    /// Whether an authoritative state arrived since the last acknowledgement
    fn has_new_state(&self) -> bool {
        self.latest_received_state().is_some()
    }
}

/// Typed input sampling for one object
pub trait InputBinding<W> {
    /// Input value stored per tick
    ///
    /// `Default` is what unknown ticks resolve to.
    type Input: Clone + Default + Serialize + DeserializeOwned;

    /// Sample the live input
    fn capture_input(&mut self, world: &W) -> Self::Input;

    /// Make `input` the one simulation code sees
    fn apply_input(&mut self, world: &mut W, input: &Self::Input);
}

/// Typed state capture and simulation for one object
pub trait StateBinding<W> {
    /// State value stored per tick
    type State: Clone + Default + Serialize + DeserializeOwned;

    /// Read the live state
    fn capture_state(&self, world: &W) -> Self::State;

    /// Overwrite the live state
    fn apply_state(&mut self, world: &mut W, state: &Self::State);

    /// Advance the live state by one tick
    fn simulate(&mut self, world: &mut W, step: &mut Step<'_, W>);
}

/// Simulation logic with nothing of its own to rewind
///
/// Controllers that only read inputs and drive other facets' state fall in
/// this category.
pub trait Behaviour<W> {
    /// Advance the world by one tick
    fn simulate(&mut self, world: &mut W, step: &mut Step<'_, W>);
}
