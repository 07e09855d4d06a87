//! History-backed input facet

use crate::{InputBinding, Ownership, Result, RewindableInput};
use rewind_buffer::TickHistoryBuffer;
use rewind_core::Tick;
use std::marker::PhantomData;
use tracing::debug;

/// Adapts an [`InputBinding`] to [`RewindableInput`]
///
/// Unknown ticks read as the most recent known input, so remote players keep
/// "holding" their last input until a newer one arrives.
pub struct InputTrack<W, B: InputBinding<W>> {
    binding: B,
    ownership: Ownership,
    buffer: TickHistoryBuffer<B::Input>,
    earliest_received: Option<Tick>,
    latest_known: Option<Tick>,
    _world: PhantomData<fn(&mut W)>,
}

impl<W, B: InputBinding<W>> InputTrack<W, B> {
    /// Create a track; history is sized when the owning object is registered
    pub fn new(binding: B, ownership: Ownership) -> Self {
        Self {
            binding,
            ownership,
            buffer: TickHistoryBuffer::default(),
            earliest_received: None,
            latest_known: None,
            _world: PhantomData,
        }
    }

    /// Locally sampled track
    pub fn local(binding: B) -> Self {
        Self::new(binding, Ownership::Local)
    }

    /// Track fed by input commits
    pub fn remote(binding: B) -> Self {
        Self::new(binding, Ownership::Remote)
    }

    /// The wrapped binding
    pub fn binding(&self) -> &B {
        &self.binding
    }

    /// Input history
    pub fn history(&self) -> &TickHistoryBuffer<B::Input> {
        &self.buffer
    }

    fn store(&mut self, input: B::Input, tick: Tick) -> Result<()> {
        self.buffer.set(input, tick)?;
        self.earliest_received = Some(self.earliest_received.map_or(tick, |e| e.min(tick)));
        self.latest_known = Some(self.latest_known.map_or(tick, |l| l.max(tick)));
        Ok(())
    }
}

impl<W, B: InputBinding<W>> RewindableInput<W> for InputTrack<W, B> {
    fn is_own(&self) -> bool {
        self.ownership.is_local()
    }

    fn activate(&mut self, _world: &W, tick: Tick, history_size: usize) {
        self.buffer = TickHistoryBuffer::new(history_size, tick);
        self.earliest_received = None;
        self.latest_known = None;
    }

    fn save_input(&mut self, world: &W, tick: Tick) {
        let input = self.binding.capture_input(world);
        if let Err(err) = self.store(input, tick) {
            debug!(tick, %err, "dropping local input");
        }
    }

    fn restore_input(&mut self, world: &mut W, tick: Tick) {
        self.binding.apply_input(world, self.buffer.get(tick));
    }

    fn encode_input(&self, tick: Tick) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self.buffer.get(tick))?)
    }

    fn handle_commit(&mut self, tick: Tick, payload: &[u8]) -> Result<()> {
        let input: B::Input = bincode::deserialize(payload)?;
        self.store(input, tick)
    }

    fn acknowledge_inputs(&mut self) {
        self.earliest_received = None;
    }

    fn earliest_received_input(&self) -> Option<Tick> {
        self.earliest_received
    }

    fn latest_known_input(&self) -> Option<Tick> {
        self.latest_known
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Pad {
        live: i8,
        applied: i8,
    }

    struct PadBinding;

    impl InputBinding<Pad> for PadBinding {
        type Input = i8;

        fn capture_input(&mut self, world: &Pad) -> i8 {
            world.live
        }

        fn apply_input(&mut self, world: &mut Pad, input: &i8) {
            world.applied = *input;
        }
    }

    fn encoded(value: i8) -> Vec<u8> {
        bincode::serialize(&value).unwrap()
    }

    #[test]
    fn test_save_and_restore() {
        let mut pad = Pad::default();
        let mut track: InputTrack<Pad, _> = InputTrack::local(PadBinding);
        track.activate(&pad, 0, 16);

        pad.live = 1;
        track.save_input(&pad, 1);
        pad.live = -1;
        track.save_input(&pad, 2);

        track.restore_input(&mut pad, 1);
        assert_eq!(pad.applied, 1);
        track.restore_input(&mut pad, 2);
        assert_eq!(pad.applied, -1);
        assert!(track.is_own());
        assert_eq!(track.latest_known_input(), Some(2));
    }

    #[test]
    fn test_unknown_tick_repeats_last_input() {
        let mut pad = Pad::default();
        let mut track: InputTrack<Pad, _> = InputTrack::remote(PadBinding);
        track.activate(&pad, 0, 16);

        track.handle_commit(3, &encoded(1)).unwrap();
        track.restore_input(&mut pad, 6);
        assert_eq!(pad.applied, 1);
        assert!(track.covers(3));
        assert!(!track.covers(4));
    }

    #[test]
    fn test_received_watermark() {
        let pad = Pad::default();
        let mut track: InputTrack<Pad, _> = InputTrack::remote(PadBinding);
        track.activate(&pad, 10, 16);
        assert!(!track.has_new_input());

        track.handle_commit(12, &encoded(1)).unwrap();
        track.handle_commit(11, &encoded(1)).unwrap();
        track.handle_commit(13, &encoded(0)).unwrap();
        assert_eq!(track.earliest_received_input(), Some(11));
        assert_eq!(track.latest_known_input(), Some(13));

        track.acknowledge_inputs();
        assert!(!track.has_new_input());
        assert_eq!(track.latest_known_input(), Some(13));
    }

    #[test]
    fn test_stale_commit_is_rejected() {
        let pad = Pad::default();
        let mut track: InputTrack<Pad, _> = InputTrack::remote(PadBinding);
        track.activate(&pad, 20, 4);

        let err = track.handle_commit(10, &encoded(1)).unwrap_err();
        assert!(err.is_stale());
        assert!(!track.has_new_input());
    }

    #[test]
    fn test_encode_matches_commit_payload() {
        let mut pad = Pad::default();
        let mut track: InputTrack<Pad, _> = InputTrack::local(PadBinding);
        track.activate(&pad, 0, 8);
        pad.live = -1;
        track.save_input(&pad, 1);

        let payload = track.encode_input(1).unwrap();
        let mut remote: InputTrack<Pad, _> = InputTrack::remote(PadBinding);
        remote.activate(&pad, 0, 8);
        remote.handle_commit(1, &payload).unwrap();
        assert_eq!(remote.history().get_exact(1), Some(&-1));
    }
}
