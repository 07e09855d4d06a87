//! History-backed state facets

use crate::{Behaviour, Ownership, Result, RewindableState, StateBinding, Step};
use rewind_buffer::TickHistoryBuffer;
use rewind_core::Tick;
use std::marker::PhantomData;
use tracing::debug;

/// Adapts a [`StateBinding`] to [`RewindableState`]
pub struct StateTrack<W, B: StateBinding<W>> {
    binding: B,
    ownership: Ownership,
    buffer: TickHistoryBuffer<B::State>,
    latest_received: Option<Tick>,
    _world: PhantomData<fn(&mut W)>,
}

impl<W, B: StateBinding<W>> StateTrack<W, B> {
    /// Create a track; history is sized when the owning object is registered
    pub fn new(binding: B, ownership: Ownership) -> Self {
        Self {
            binding,
            ownership,
            buffer: TickHistoryBuffer::default(),
            latest_received: None,
            _world: PhantomData,
        }
    }

    /// Locally predicted track
    pub fn local(binding: B) -> Self {
        Self::new(binding, Ownership::Local)
    }

    /// Track fed by state commits
    pub fn remote(binding: B) -> Self {
        Self::new(binding, Ownership::Remote)
    }

    /// The wrapped binding
    pub fn binding(&self) -> &B {
        &self.binding
    }

    /// State history
    pub fn history(&self) -> &TickHistoryBuffer<B::State> {
        &self.buffer
    }
}

impl<W, B: StateBinding<W>> RewindableState<W> for StateTrack<W, B> {
    fn is_own(&self) -> bool {
        self.ownership.is_local()
    }

    fn activate(&mut self, world: &W, tick: Tick, history_size: usize) {
        let live = self.binding.capture_state(world);
        self.buffer = TickHistoryBuffer::backfilled(history_size, tick, live);
        self.latest_received = None;
    }

    fn save_state(&mut self, world: &W, tick: Tick) {
        let state = self.binding.capture_state(world);
        if let Err(err) = self.buffer.set(state, tick) {
            debug!(tick, %err, "dropping simulated state");
        }
    }

    fn restore_state(&mut self, world: &mut W, tick: Tick) {
        self.binding.apply_state(world, self.buffer.get(tick));
    }

    fn simulate(&mut self, world: &mut W, step: &mut Step<'_, W>) {
        self.binding.simulate(world, step);
    }

    fn encode_state(&self, tick: Tick) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self.buffer.get(tick))?)
    }

    fn handle_commit(&mut self, tick: Tick, payload: &[u8]) -> Result<()> {
        let state: B::State = bincode::deserialize(payload)?;
        self.buffer.set(state, tick)?;
        self.latest_received = Some(self.latest_received.map_or(tick, |l| l.max(tick)));
        Ok(())
    }

    fn acknowledge_states(&mut self) {
        self.latest_received = None;
    }

    fn latest_received_state(&self) -> Option<Tick> {
        self.latest_received
    }
}

/// Adapts a [`Behaviour`] to [`RewindableState`]
///
/// Has no history: saving, restoring and commits are no-ops, and it never
/// reports a received state.
pub struct BehaviourTrack<W, B: Behaviour<W>> {
    behaviour: B,
    ownership: Ownership,
    _world: PhantomData<fn(&mut W)>,
}

impl<W, B: Behaviour<W>> BehaviourTrack<W, B> {
    /// Create a behaviour track
    pub fn new(behaviour: B, ownership: Ownership) -> Self {
        Self {
            behaviour,
            ownership,
            _world: PhantomData,
        }
    }

    /// The wrapped behaviour
    pub fn behaviour(&self) -> &B {
        &self.behaviour
    }
}

impl<W, B: Behaviour<W>> RewindableState<W> for BehaviourTrack<W, B> {
    fn is_own(&self) -> bool {
        self.ownership.is_local()
    }

    fn activate(&mut self, _world: &W, _tick: Tick, _history_size: usize) {}

    fn save_state(&mut self, _world: &W, _tick: Tick) {}

    fn restore_state(&mut self, _world: &mut W, _tick: Tick) {}

    fn simulate(&mut self, world: &mut W, step: &mut Step<'_, W>) {
        self.behaviour.simulate(world, step);
    }

    fn encode_state(&self, _tick: Tick) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn handle_commit(&mut self, _tick: Tick, _payload: &[u8]) -> Result<()> {
        Ok(())
    }

    fn acknowledge_states(&mut self) {}

    fn latest_received_state(&self) -> Option<Tick> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Commands;
    use rewind_core::ObjectId;

    #[derive(Default)]
    struct Counter {
        value: i32,
        steps: u32,
    }

    struct CounterBinding;

    impl StateBinding<Counter> for CounterBinding {
        type State = i32;

        fn capture_state(&self, world: &Counter) -> i32 {
            world.value
        }

        fn apply_state(&mut self, world: &mut Counter, state: &i32) {
            world.value = *state;
        }

        fn simulate(&mut self, world: &mut Counter, _step: &mut Step<'_, Counter>) {
            world.value += 1;
        }
    }

    struct Ticker;

    impl Behaviour<Counter> for Ticker {
        fn simulate(&mut self, world: &mut Counter, _step: &mut Step<'_, Counter>) {
            world.steps += 1;
        }
    }

    fn simulate_once(track: &mut impl RewindableState<Counter>, world: &mut Counter, tick: Tick) {
        let mut commands = Commands::new();
        let mut step = Step::new(tick, 0.1, 0.0, ObjectId::new(1), true, &mut commands);
        track.simulate(world, &mut step);
    }

    #[test]
    fn test_activation_backfills_live_state() {
        let world = Counter {
            value: 5,
            steps: 0,
        };
        let mut track: StateTrack<Counter, _> = StateTrack::local(CounterBinding);
        track.activate(&world, 10, 8);

        assert_eq!(track.history().get_exact(3), Some(&5));
        assert_eq!(track.history().get_exact(10), Some(&5));
        assert!(!track.has_new_state());
    }

    #[test]
    fn test_simulate_save_restore() {
        let mut world = Counter::default();
        let mut track: StateTrack<Counter, _> = StateTrack::local(CounterBinding);
        track.activate(&world, 0, 8);

        for tick in 1..=3 {
            simulate_once(&mut track, &mut world, tick);
            track.save_state(&world, tick);
        }
        assert_eq!(world.value, 3);

        track.restore_state(&mut world, 1);
        assert_eq!(world.value, 1);
    }

    #[test]
    fn test_commit_overwrites_prediction() {
        let mut world = Counter::default();
        let mut track: StateTrack<Counter, _> = StateTrack::local(CounterBinding);
        track.activate(&world, 0, 8);
        world.value = 4;
        track.save_state(&world, 2);

        let payload = bincode::serialize(&40i32).unwrap();
        track.handle_commit(2, &payload).unwrap();
        track.handle_commit(1, &payload).unwrap();
        assert_eq!(track.latest_received_state(), Some(2));

        track.restore_state(&mut world, 2);
        assert_eq!(world.value, 40);

        track.acknowledge_states();
        assert!(!track.has_new_state());
    }

    #[test]
    fn test_encode_state() {
        let world = Counter {
            value: 9,
            steps: 0,
        };
        let mut track: StateTrack<Counter, _> = StateTrack::remote(CounterBinding);
        track.activate(&world, 0, 4);

        let payload = track.encode_state(0).unwrap();
        let decoded: i32 = bincode::deserialize(&payload).unwrap();
        assert_eq!(decoded, 9);
        assert!(!track.is_own());
    }

    #[test]
    fn test_behaviour_track_only_simulates() {
        let mut world = Counter::default();
        let mut track: BehaviourTrack<Counter, _> = BehaviourTrack::new(Ticker, Ownership::Local);
        track.activate(&world, 0, 4);

        simulate_once(&mut track, &mut world, 1);
        simulate_once(&mut track, &mut world, 2);
        track.save_state(&world, 2);
        track.restore_state(&mut world, 0);

        assert_eq!(world.steps, 2);
        assert!(track.handle_commit(1, &[1, 2, 3]).is_ok());
        assert!(!track.has_new_state());
        assert!(track.encode_state(1).unwrap().is_empty());
    }
}
