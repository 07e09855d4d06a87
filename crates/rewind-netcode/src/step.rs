//! Per-tick simulation context handed to state facets

use crate::RewindableObject;
use rewind_core::{ObjectId, Tick};

/// Structural changes requested while simulating a tick
///
/// The manager applies them after the tick's states were saved, so the
/// object set never changes underneath the facets being iterated.
pub struct Commands<W> {
    spawns: Vec<RewindableObject<W>>,
    destroy_marks: Vec<(ObjectId, Tick)>,
}

impl<W> Commands<W> {
    /// Create an empty command list
    pub fn new() -> Self {
        Self {
            spawns: Vec::new(),
            destroy_marks: Vec::new(),
        }
    }

    /// Objects queued for registration
    pub fn spawns(&self) -> &[RewindableObject<W>] {
        &self.spawns
    }

    /// Destroy marks queued as `(object, tick)`
    pub fn destroy_marks(&self) -> &[(ObjectId, Tick)] {
        &self.destroy_marks
    }

    /// Check if no command was queued
    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.destroy_marks.is_empty()
    }

    pub(crate) fn take(&mut self) -> (Vec<RewindableObject<W>>, Vec<(ObjectId, Tick)>) {
        (
            std::mem::take(&mut self.spawns),
            std::mem::take(&mut self.destroy_marks),
        )
    }
}

impl<W> Default for Commands<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Context for one facet simulating one tick
pub struct Step<'a, W> {
    tick: Tick,
    delta: f32,
    time: f64,
    object: ObjectId,
    authoritative: bool,
    commands: &'a mut Commands<W>,
}

impl<'a, W> Step<'a, W> {
    /// Create a step context
    pub fn new(
        tick: Tick,
        delta: f32,
        time: f64,
        object: ObjectId,
        authoritative: bool,
        commands: &'a mut Commands<W>,
    ) -> Self {
        Self {
            tick,
            delta,
            time,
            object,
            authoritative,
            commands,
        }
    }

    /// Tick being simulated
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Fixed tick duration in seconds
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Simulated time at this tick
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Object owning the facet being simulated
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Whether this peer's result is authoritative
    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    /// Register a new object after this tick
    ///
    /// Replays run this again for the same tick, so guard the call with a
    /// [`OnceFlag`](rewind_core::OnceFlag).
    ///
    /// The object's histories are backfilled at the spawning tick and it
    /// joins replays from the next outer tick. When the spawn happens while
    /// replaying an earlier tick, the ticks between it and the current tick
    /// are not simulated for the new object until a later replay covers them.
    pub fn spawn(&mut self, object: RewindableObject<W>) {
        self.commands.spawns.push(object);
    }

    /// Mark an object as gone from `tick` onwards
    ///
    /// Ignored on non-authoritative peers; they learn about it from the
    /// authority's destroy mark.
    pub fn mark_for_destroy(&mut self, object: ObjectId, tick: Tick) {
        if self.authoritative {
            self.commands.destroy_marks.push((object, tick));
        }
    }

    /// Mark the simulated object as gone from the next tick
    pub fn destroy_self(&mut self) {
        let (object, tick) = (self.object, self.tick + 1);
        self.mark_for_destroy(object, tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_accessors() {
        let mut commands: Commands<()> = Commands::new();
        let step = Step::new(4, 0.5, 2.0, ObjectId::new(9), true, &mut commands);
        assert_eq!(step.tick(), 4);
        assert_eq!(step.delta(), 0.5);
        assert_eq!(step.time(), 2.0);
        assert_eq!(step.object(), ObjectId::new(9));
        assert!(step.is_authoritative());
    }

    #[test]
    fn test_destroy_self_marks_next_tick() {
        let mut commands: Commands<()> = Commands::new();
        let mut step = Step::new(4, 0.5, 2.0, ObjectId::new(9), true, &mut commands);
        step.destroy_self();
        assert_eq!(commands.destroy_marks(), &[(ObjectId::new(9), 5)]);
    }

    #[test]
    fn test_non_authoritative_marks_are_ignored() {
        let mut commands: Commands<()> = Commands::new();
        let mut step = Step::new(4, 0.5, 2.0, ObjectId::new(9), false, &mut commands);
        step.mark_for_destroy(ObjectId::new(1), 6);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_spawn_is_queued() {
        let mut commands: Commands<()> = Commands::new();
        let mut step = Step::new(4, 0.5, 2.0, ObjectId::new(9), false, &mut commands);
        step.spawn(RewindableObject::new(ObjectId::new(10)));

        let (spawns, marks) = commands.take();
        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].id(), ObjectId::new(10));
        assert!(marks.is_empty());
        assert!(commands.is_empty());
    }
}
