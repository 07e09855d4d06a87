//! Observation points around resimulation

use rewind_core::{Tick, TickRange};

/// Callbacks invoked by the rewind manager
///
/// All methods default to doing nothing, so implementors only override the
/// points they care about. Typical uses are stepping a physics world after
/// facets wrote their state, or snapping visuals after the display restore.
pub trait RewindHooks<W> {
    /// Called once before a replay window is simulated
    fn before_resimulate(&mut self, _world: &mut W, _range: TickRange) {}

    /// Called after inputs and states were restored for `tick`
    fn on_tick_restore(&mut self, _world: &mut W, _tick: Tick) {}

    /// Called after every facet simulated `tick`, before states are saved
    fn on_tick_simulate(&mut self, _world: &mut W, _tick: Tick, _delta: f32) {}

    /// Called after the world was restored to the display tick
    fn on_visual_restore(&mut self, _world: &mut W, _tick: Tick) {}
}
