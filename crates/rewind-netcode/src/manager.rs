//! Rewind manager
//!
//! Drives every registered object through restore, simulate, save and commit
//! for each tick of a replay window. The window depends on the peer's role:
//!
//! - **Host**: from the earliest newly received input (its own input arrives
//!   every tick, so at least the current tick is simulated).
//! - **Client**: from the newest authoritative state received for one of its
//!   own states, otherwise only the current tick.
//! - **Server**: only when new input arrived, from the earliest such tick.
//!
//! Incoming messages never trigger a replay directly; they only stage data
//! that the next [`RewindManager::tick`] consumes.

use crate::{
    Channel, Commands, Error, Message, ObjectDirectory, Recipient, Result, RewindHooks,
    RewindableObject, Role, StateEntry, Step,
};
use indexmap::IndexMap;
use rewind_core::{
    AppliedMutations, DeferredMutableSet, InputSlot, ObjectId, PeerId, RewindConfig, StateSlot,
    Tick, TickRange,
};
use tracing::{debug, info, trace, warn};

/// What a call to [`RewindManager::tick`] did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Tick that was advanced to
    pub tick: Tick,
    /// Ticks that were (re)simulated, if any
    pub replay: Option<TickRange>,
    /// Number of state facet simulation steps
    pub simulated: usize,
    /// Number of states committed to observers
    pub committed: usize,
    /// Objects removed because their destroy mark left the history window
    pub despawned: Vec<ObjectId>,
    /// Tick the world shows after the call
    pub display_tick: Tick,
    /// Messages the channel refused
    pub send_failures: usize,
    /// Registration changes that became visible this tick
    pub registry: AppliedMutations,
}

/// Schedules replays of registered objects for one peer
pub struct RewindManager<W> {
    role: Role,
    peer: PeerId,
    config: RewindConfig,
    registry: DeferredMutableSet<ObjectId>,
    objects: IndexMap<ObjectId, RewindableObject<W>>,
    hooks: Vec<Box<dyn RewindHooks<W>>>,
    commands: Commands<W>,
    current_tick: Tick,
    time: f64,
}

impl<W: ObjectDirectory> RewindManager<W> {
    /// Create a manager for an authoritative peer
    pub fn new(role: Role, config: RewindConfig) -> Self {
        Self::with_peer(role, PeerId::AUTHORITY, config)
    }

    /// Create a manager that signs its input commits with `peer`
    pub fn with_peer(role: Role, peer: PeerId, config: RewindConfig) -> Self {
        Self {
            role,
            peer,
            config,
            registry: DeferredMutableSet::new(),
            objects: IndexMap::new(),
            hooks: Vec::new(),
            commands: Commands::new(),
            current_tick: 0,
            time: 0.0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn config(&self) -> &RewindConfig {
        &self.config
    }

    /// Tick of the last [`tick`](Self::tick) call
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Simulated time of the tick being (or last) simulated
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Tick the world is restored to for presentation
    pub fn display_tick(&self) -> Tick {
        self.current_tick - self.config.display_offset()
    }

    /// Add observation callbacks
    pub fn add_hooks(&mut self, hooks: impl RewindHooks<W> + 'static) {
        self.hooks.push(Box::new(hooks));
    }

    /// Register an object at the current tick
    ///
    /// Its histories are sized and backfilled from `world` right away; it
    /// takes part in replays from the next tick on. Registering an id that
    /// is already known replaces that object.
    pub fn register(&mut self, world: &W, object: RewindableObject<W>) -> ObjectId {
        self.register_at(world, object, self.current_tick)
    }

    /// Stop replaying an object from the next tick on
    ///
    /// Returns `false` if the id is unknown. Registering the id again before
    /// the next tick withdraws the removal.
    pub fn unregister(&mut self, id: ObjectId) -> bool {
        if !self.objects.contains_key(&id) {
            return false;
        }
        self.registry.remove(id);
        true
    }

    /// Whether the object takes part in replays
    pub fn contains(&self, id: ObjectId) -> bool {
        self.registry.contains(&id)
    }

    /// Number of objects taking part in replays
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Look up a stored object, including ones not yet active
    pub fn object(&self, id: ObjectId) -> Option<&RewindableObject<W>> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut RewindableObject<W>> {
        self.objects.get_mut(&id)
    }

    /// Ids of objects taking part in replays, in registration order
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.registry.iter().copied()
    }

    /// Mark an object as gone from `tick` onwards and tell observers
    ///
    /// Only the earliest mark is kept. Returns whether the mark changed.
    pub fn mark_for_destroy<C: Channel>(
        &mut self,
        id: ObjectId,
        tick: Tick,
        channel: &mut C,
    ) -> Result<bool> {
        if !self.role.is_authoritative() {
            return Err(Error::NotAuthoritative(id));
        }
        let object = self.objects.get_mut(&id).ok_or(Error::UnknownObject(id))?;
        if !object.mark_for_destroy(tick) {
            return Ok(false);
        }

        info!(object = %id, tick, "marked for destroy");
        channel
            .send(Recipient::Observers, &Message::DestroyMark { object: id, tick })
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(true)
    }

    /// Stage a received message for the next tick
    ///
    /// Commits older than the history window are dropped silently. Every
    /// valid entry of a state batch is applied even when another entry
    /// fails; the first failure is returned afterwards.
    pub fn handle_message(&mut self, message: &Message) -> Result<()> {
        match message {
            Message::InputCommit {
                sender,
                object,
                slot,
                tick,
                payload,
            } => {
                if !self.role.is_authoritative() {
                    return Err(self.unexpected(message));
                }
                let target = self
                    .objects
                    .get_mut(object)
                    .ok_or(Error::UnknownObject(*object))?;
                let input = target.input_mut(*slot).ok_or(Error::UnknownInput {
                    object: *object,
                    slot: *slot,
                })?;
                trace!(%sender, %object, tick, "input commit");
                drop_stale(input.handle_commit(*tick, payload), message)
            }
            Message::StateCommit { tick, states } => {
                if self.role != Role::Client {
                    return Err(self.unexpected(message));
                }
                let mut first_error = None;
                for entry in states {
                    let Some(target) = self.objects.get_mut(&entry.object) else {
                        debug!(object = %entry.object, tick, "state for unknown object");
                        continue;
                    };
                    let result = match target.state_mut(entry.slot) {
                        Some(state) => {
                            drop_stale(state.handle_commit(*tick, &entry.payload), message)
                        }
                        None => Err(Error::UnknownState {
                            object: entry.object,
                            slot: entry.slot,
                        }),
                    };
                    if let Err(err) = result {
                        warn!(
                            object = %entry.object,
                            slot = %entry.slot,
                            tick,
                            %err,
                            "skipping state entry"
                        );
                        first_error.get_or_insert(err);
                    }
                }
                first_error.map_or(Ok(()), Err)
            }
            Message::DestroyMark { object, tick } => {
                if self.role.is_authoritative() {
                    return Err(self.unexpected(message));
                }
                let target = self
                    .objects
                    .get_mut(object)
                    .ok_or(Error::UnknownObject(*object))?;
                if target.mark_for_destroy(*tick) {
                    debug!(%object, tick, "destroy mark received");
                }
                Ok(())
            }
        }
    }

    /// Advance to `tick`, replaying whatever the role requires
    pub fn tick<C: Channel>(
        &mut self,
        world: &mut W,
        tick: Tick,
        delta: f32,
        channel: &mut C,
    ) -> TickReport {
        self.current_tick = tick;
        let mut report = TickReport {
            tick,
            display_tick: self.display_tick(),
            ..TickReport::default()
        };

        report.registry = self.registry.acknowledge_mutations();
        let registry = &self.registry;
        self.objects.retain(|id, _| registry.contains(id));
        let active: Vec<ObjectId> = self.registry.iter().copied().collect();

        if self.role.has_local_input() {
            self.capture_inputs(world, tick, &active, channel, &mut report);
        }

        let start = match self.role {
            Role::Host => Some(self.earliest_new_input(&active).unwrap_or(tick)),
            Role::Client => Some(self.earliest_new_state(&active).unwrap_or(tick)),
            Role::Server => self.earliest_new_input(&active),
        };

        if let Some(start) = start {
            let range = self.replay_range(start, tick);
            report.replay = Some(range);
            self.replay(world, range, delta, &active, channel, &mut report);
            self.acknowledge(&active);
            self.restore_display(world, report.display_tick, &active);
        }

        self.despawn_expired(world, tick, &active, &mut report);

        report
    }

    fn register_at(&mut self, world: &W, mut object: RewindableObject<W>, tick: Tick) -> ObjectId {
        let id = object.id();
        object.activate(world, tick, self.config.history_size());
        if self.objects.insert(id, object).is_some() {
            debug!(object = %id, "replacing registered object");
        }
        self.registry.cancel_remove(&id);
        self.registry.add(id);
        debug!(object = %id, tick, "registered");
        id
    }

    fn unexpected(&self, message: &Message) -> Error {
        Error::UnexpectedMessage {
            role: self.role,
            kind: message.kind(),
        }
    }

    fn capture_inputs<C: Channel>(
        &mut self,
        world: &W,
        tick: Tick,
        active: &[ObjectId],
        channel: &mut C,
        report: &mut TickReport,
    ) {
        let commit = self.role == Role::Client;
        for id in active {
            let Some(object) = self.objects.get_mut(id) else {
                continue;
            };
            for (index, input) in object.inputs_mut().enumerate() {
                if !input.is_own() {
                    continue;
                }
                input.save_input(world, tick);
                if !commit {
                    continue;
                }

                let payload = match input.encode_input(tick) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(object = %id, tick, %err, "failed to encode input");
                        continue;
                    }
                };
                let message = Message::InputCommit {
                    sender: self.peer,
                    object: *id,
                    slot: InputSlot(index as u16),
                    tick,
                    payload,
                };
                if !send(channel, Recipient::Authority, &message) {
                    report.send_failures += 1;
                }
            }
        }
    }

    fn earliest_new_input(&self, active: &[ObjectId]) -> Option<Tick> {
        active
            .iter()
            .filter_map(|id| self.objects.get(id))
            .flat_map(|object| object.inputs())
            .filter_map(|input| input.earliest_received_input())
            .min()
    }

    fn earliest_new_state(&self, active: &[ObjectId]) -> Option<Tick> {
        active
            .iter()
            .filter_map(|id| self.objects.get(id))
            .flat_map(|object| object.states.iter())
            .filter(|state| state.facet.is_own())
            .filter_map(|state| state.facet.latest_received_state())
            .min()
    }

    fn replay_range(&self, start: Tick, tick: Tick) -> TickRange {
        let oldest = tick - self.config.history_size() as Tick + 1;
        let mut from = start.min(tick);
        if from < oldest {
            warn!(requested = from, oldest, "replay window exceeds history, clamping");
            from = oldest;
        }
        TickRange::new(from, tick)
    }

    fn replay<C: Channel>(
        &mut self,
        world: &mut W,
        range: TickRange,
        delta: f32,
        active: &[ObjectId],
        channel: &mut C,
        report: &mut TickReport,
    ) {
        debug!(role = %self.role, from = range.from, to = range.to, "resimulating");
        for hooks in &mut self.hooks {
            hooks.before_resimulate(world, range);
        }

        let authoritative = self.role.is_authoritative();
        let mut simulated: Vec<(ObjectId, usize)> = Vec::new();

        for tick in range.iter() {
            self.time = tick as f64 * f64::from(delta);

            for id in active {
                if let Some(object) = self.objects.get_mut(id) {
                    for input in object.inputs_mut() {
                        input.restore_input(world, tick);
                    }
                }
            }
            for id in active {
                if let Some(object) = self.objects.get_mut(id) {
                    for state in &mut object.states {
                        state.facet.restore_state(world, tick - 1);
                    }
                }
            }
            self.apply_aliveness(world, tick, active);
            for hooks in &mut self.hooks {
                hooks.on_tick_restore(world, tick);
            }

            simulated.clear();
            for id in active {
                let Some(object) = self.objects.get_mut(id) else {
                    continue;
                };
                for index in 0..object.states.len() {
                    if !object.should_simulate(index, tick, self.role) {
                        trace!(object = %id, state = index, tick, "not simulating");
                        continue;
                    }
                    let mut step =
                        Step::new(tick, delta, self.time, *id, authoritative, &mut self.commands);
                    object.states[index].facet.simulate(world, &mut step);
                    simulated.push((*id, index));
                }
            }
            report.simulated += simulated.len();
            for hooks in &mut self.hooks {
                hooks.on_tick_simulate(world, tick, delta);
            }

            let mut entries = Vec::new();
            for &(id, index) in &simulated {
                let Some(object) = self.objects.get_mut(&id) else {
                    continue;
                };
                let facet = &mut object.states[index].facet;
                facet.save_state(world, tick);
                if !authoritative {
                    continue;
                }
                match facet.encode_state(tick) {
                    Ok(payload) => entries.push(StateEntry {
                        object: id,
                        slot: StateSlot(index as u16),
                        payload,
                    }),
                    Err(err) => warn!(object = %id, tick, %err, "failed to encode state"),
                }
            }
            if !entries.is_empty() {
                let count = entries.len();
                let message = Message::StateCommit {
                    tick,
                    states: entries,
                };
                if send(channel, Recipient::Observers, &message) {
                    report.committed += count;
                } else {
                    report.send_failures += 1;
                }
            }

            self.apply_commands(world, tick, channel, report);
        }
    }

    fn apply_commands<C: Channel>(
        &mut self,
        world: &W,
        tick: Tick,
        channel: &mut C,
        report: &mut TickReport,
    ) {
        if self.commands.is_empty() {
            return;
        }
        let (spawns, marks) = self.commands.take();

        for object in spawns {
            self.register_at(world, object, tick);
        }
        for (id, at) in marks {
            let Some(object) = self.objects.get_mut(&id) else {
                debug!(object = %id, "destroy mark for unknown object");
                continue;
            };
            if object.mark_for_destroy(at) {
                info!(object = %id, tick = at, "marked for destroy");
                let message = Message::DestroyMark { object: id, tick: at };
                if !send(channel, Recipient::Observers, &message) {
                    report.send_failures += 1;
                }
            }
        }
    }

    fn apply_aliveness(&self, world: &mut W, tick: Tick, active: &[ObjectId]) {
        for id in active {
            if let Some(object) = self.objects.get(id) {
                if object.destroy_tick().is_some() {
                    world.set_active(*id, object.is_alive_at(tick));
                }
            }
        }
    }

    fn acknowledge(&mut self, active: &[ObjectId]) {
        for id in active {
            if let Some(object) = self.objects.get_mut(id) {
                for input in object.inputs_mut() {
                    input.acknowledge_inputs();
                }
                for state in &mut object.states {
                    state.facet.acknowledge_states();
                }
            }
        }
    }

    fn restore_display(&mut self, world: &mut W, display: Tick, active: &[ObjectId]) {
        self.apply_aliveness(world, display, active);
        for id in active {
            if let Some(object) = self.objects.get_mut(id) {
                for state in &mut object.states {
                    state.facet.restore_state(world, display);
                }
            }
        }
        for hooks in &mut self.hooks {
            hooks.on_visual_restore(world, display);
        }
    }

    fn despawn_expired(
        &mut self,
        world: &mut W,
        tick: Tick,
        active: &[ObjectId],
        report: &mut TickReport,
    ) {
        let horizon = tick - self.config.history_size() as Tick;
        for id in active {
            let expired = self
                .objects
                .get(id)
                .and_then(|object| object.destroy_tick())
                .is_some_and(|destroy| destroy < horizon);
            if expired && self.registry.remove(*id) {
                info!(object = %id, tick, "despawning");
                world.despawn(*id);
                report.despawned.push(*id);
            }
        }
    }
}

fn send<C: Channel>(channel: &mut C, recipient: Recipient, message: &Message) -> bool {
    match channel.send(recipient, message) {
        Ok(()) => true,
        Err(err) => {
            warn!(kind = message.kind(), tick = message.tick(), %err, "failed to send");
            false
        }
    }
}

fn drop_stale(result: Result<()>, message: &Message) -> Result<()> {
    match result {
        Err(err) if err.is_stale() => {
            debug!(kind = message.kind(), tick = message.tick(), %err, "dropping stale commit");
            Ok(())
        }
        other => other,
    }
}
