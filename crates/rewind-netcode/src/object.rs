//! Networked object: a set of input and state facets under one id

use crate::{Error, Result, Role, RewindableInput, RewindableState};
use rewind_core::{InputSlot, ObjectId, StateSlot, Tick};

/// A state facet and the input that drives it
pub(crate) struct StateFacet<W> {
    pub(crate) facet: Box<dyn RewindableState<W>>,
    pub(crate) controlled_by: Option<InputSlot>,
}

/// An object whose facets are saved, restored and replayed together
pub struct RewindableObject<W> {
    id: ObjectId,
    inputs: Vec<Box<dyn RewindableInput<W>>>,
    pub(crate) states: Vec<StateFacet<W>>,
    destroy_tick: Option<Tick>,
}

impl<W> RewindableObject<W> {
    /// Create an object without facets
    pub fn new(id: ObjectId) -> Self {
        Self {
            id,
            inputs: Vec::new(),
            states: Vec::new(),
            destroy_tick: None,
        }
    }

    /// Object id
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Attach an input facet
    pub fn add_input(&mut self, input: impl RewindableInput<W> + 'static) -> InputSlot {
        let slot = InputSlot(self.inputs.len() as u16);
        self.inputs.push(Box::new(input));
        slot
    }

    /// Attach a state facet
    ///
    /// With a controller, authoritative peers only simulate this state for
    /// ticks the controller's input is known for, and clients only predict it
    /// while that holds for their own input.
    pub fn add_state(
        &mut self,
        state: impl RewindableState<W> + 'static,
        controlled_by: Option<InputSlot>,
    ) -> Result<StateSlot> {
        if let Some(slot) = controlled_by {
            if slot.index() >= self.inputs.len() {
                return Err(Error::UnknownInput {
                    object: self.id,
                    slot,
                });
            }
        }
        let slot = StateSlot(self.states.len() as u16);
        self.states.push(StateFacet {
            facet: Box::new(state),
            controlled_by,
        });
        Ok(slot)
    }

    /// Builder form of [`add_input`](Self::add_input)
    pub fn with_input(mut self, input: impl RewindableInput<W> + 'static) -> Self {
        self.add_input(input);
        self
    }

    /// Number of input facets
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of state facets
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Input facet at `slot`
    pub fn input(&self, slot: InputSlot) -> Option<&dyn RewindableInput<W>> {
        self.inputs.get(slot.index()).map(|input| input.as_ref())
    }

    /// Mutable input facet at `slot`
    pub fn input_mut(&mut self, slot: InputSlot) -> Option<&mut (dyn RewindableInput<W> + 'static)> {
        self.inputs.get_mut(slot.index()).map(|input| input.as_mut())
    }

    /// State facet at `slot`
    pub fn state(&self, slot: StateSlot) -> Option<&dyn RewindableState<W>> {
        self.states.get(slot.index()).map(|state| state.facet.as_ref())
    }

    /// Mutable state facet at `slot`
    pub fn state_mut(&mut self, slot: StateSlot) -> Option<&mut (dyn RewindableState<W> + 'static)> {
        self.states
            .get_mut(slot.index())
            .map(|state| state.facet.as_mut())
    }

    /// Input that controls the state at `slot`
    pub fn controller_of(&self, slot: StateSlot) -> Option<InputSlot> {
        self.states.get(slot.index()).and_then(|state| state.controlled_by)
    }

    /// First tick at which the object no longer exists
    pub fn destroy_tick(&self) -> Option<Tick> {
        self.destroy_tick
    }

    /// Whether the object exists while simulating or displaying `tick`
    pub fn is_alive_at(&self, tick: Tick) -> bool {
        self.destroy_tick.map_or(true, |destroy| tick < destroy)
    }

    /// Record a destroy mark, keeping the earliest one
    ///
    /// Returns whether the mark changed.
    pub fn mark_for_destroy(&mut self, tick: Tick) -> bool {
        match self.destroy_tick {
            Some(existing) if existing <= tick => false,
            _ => {
                self.destroy_tick = Some(tick);
                true
            }
        }
    }

    pub(crate) fn activate(&mut self, world: &W, tick: Tick, history_size: usize) {
        for input in &mut self.inputs {
            input.activate(world, tick, history_size);
        }
        for state in &mut self.states {
            state.facet.activate(world, tick, history_size);
        }
    }

    pub(crate) fn inputs_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn RewindableInput<W>>> {
        self.inputs.iter_mut()
    }

    pub(crate) fn inputs(&self) -> impl Iterator<Item = &Box<dyn RewindableInput<W>>> {
        self.inputs.iter()
    }

    /// Whether the state at `index` takes part in simulating `tick`
    pub(crate) fn should_simulate(&self, index: usize, tick: Tick, role: Role) -> bool {
        let Some(state) = self.states.get(index) else {
            return false;
        };
        let input_known = match state.controlled_by {
            None => true,
            Some(slot) => self
                .inputs
                .get(slot.index())
                .is_some_and(|input| input.covers(tick)),
        };

        match role {
            Role::Host | Role::Server => input_known,
            Role::Client => {
                let ahead_of_authority = state
                    .facet
                    .latest_received_state()
                    .map_or(true, |received| tick > received);
                state.facet.is_own() && input_known && ahead_of_authority
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InputBinding, InputTrack, StateBinding, StateTrack, Step};

    #[derive(Default)]
    struct Ball {
        push: i32,
        position: i32,
    }

    struct Push;

    impl InputBinding<Ball> for Push {
        type Input = i32;

        fn capture_input(&mut self, world: &Ball) -> i32 {
            world.push
        }

        fn apply_input(&mut self, world: &mut Ball, input: &i32) {
            world.push = *input;
        }
    }

    struct Position;

    impl StateBinding<Ball> for Position {
        type State = i32;

        fn capture_state(&self, world: &Ball) -> i32 {
            world.position
        }

        fn apply_state(&mut self, world: &mut Ball, state: &i32) {
            world.position = *state;
        }

        fn simulate(&mut self, world: &mut Ball, _step: &mut Step<'_, Ball>) {
            world.position += world.push;
        }
    }

    fn ball(input: InputTrack<Ball, Push>, state: StateTrack<Ball, Position>) -> RewindableObject<Ball> {
        let mut object = RewindableObject::new(ObjectId::new(1));
        let slot = object.add_input(input);
        object.add_state(state, Some(slot)).unwrap();
        object.activate(&Ball::default(), 0, 16);
        object
    }

    #[test]
    fn test_slots_are_assigned_in_order() {
        let mut object: RewindableObject<Ball> = RewindableObject::new(ObjectId::new(1));
        assert_eq!(object.add_input(InputTrack::local(Push)), InputSlot(0));
        assert_eq!(object.add_input(InputTrack::remote(Push)), InputSlot(1));
        let slot = object
            .add_state(StateTrack::local(Position), Some(InputSlot(1)))
            .unwrap();
        assert_eq!(slot, StateSlot(0));
        assert_eq!(object.controller_of(slot), Some(InputSlot(1)));
        assert_eq!(object.input_count(), 2);
        assert_eq!(object.state_count(), 1);
    }

    #[test]
    fn test_unknown_controller_is_rejected() {
        let mut object: RewindableObject<Ball> = RewindableObject::new(ObjectId::new(1));
        let result = object.add_state(StateTrack::local(Position), Some(InputSlot(0)));
        assert!(matches!(result, Err(Error::UnknownInput { .. })));
    }

    #[test]
    fn test_destroy_mark_keeps_earliest() {
        let mut object: RewindableObject<Ball> = RewindableObject::new(ObjectId::new(1));
        assert!(object.is_alive_at(1_000));

        assert!(object.mark_for_destroy(20));
        assert!(!object.mark_for_destroy(25));
        assert!(object.mark_for_destroy(15));
        assert_eq!(object.destroy_tick(), Some(15));
        assert!(object.is_alive_at(14));
        assert!(!object.is_alive_at(15));
    }

    #[test]
    fn test_authority_waits_for_controller_input() {
        let mut object = ball(InputTrack::remote(Push), StateTrack::remote(Position));
        assert!(!object.should_simulate(0, 5, Role::Server));

        let payload = bincode::serialize(&1i32).unwrap();
        object
            .input_mut(InputSlot(0))
            .unwrap()
            .handle_commit(5, &payload)
            .unwrap();
        assert!(object.should_simulate(0, 5, Role::Server));
        assert!(object.should_simulate(0, 4, Role::Host));
        assert!(!object.should_simulate(0, 6, Role::Server));
    }

    #[test]
    fn test_client_predicts_only_own_states_past_authority() {
        let mut world = Ball::default();
        let mut object = ball(InputTrack::local(Push), StateTrack::local(Position));
        object.inputs_mut().for_each(|input| input.save_input(&world, 7));
        assert!(object.should_simulate(0, 7, Role::Client));

        let payload = bincode::serialize(&3i32).unwrap();
        object
            .state_mut(StateSlot(0))
            .unwrap()
            .handle_commit(6, &payload)
            .unwrap();
        assert!(!object.should_simulate(0, 6, Role::Client));
        assert!(object.should_simulate(0, 7, Role::Client));

        object.state_mut(StateSlot(0)).unwrap().restore_state(&mut world, 6);
        assert_eq!(world.position, 3);

        let remote = ball(InputTrack::remote(Push), StateTrack::remote(Position));
        assert!(!remote.should_simulate(0, 7, Role::Client));
    }

    #[test]
    fn test_uncontrolled_state_always_simulates_on_authority() {
        let mut object: RewindableObject<Ball> = RewindableObject::new(ObjectId::new(2));
        object.add_state(StateTrack::remote(Position), None).unwrap();
        object.activate(&Ball::default(), 0, 8);
        assert!(object.should_simulate(0, 100, Role::Server));
        assert!(!object.should_simulate(1, 100, Role::Server));
    }
}
