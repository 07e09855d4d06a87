//! Demo world: bodies sliding along a line

use rewind_netcode::{InputBinding, ObjectDirectory, ObjectId, StateBinding, Step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distance a body covers per tick at full stick
pub const SPEED: i64 = 100;
/// Patrols turn around past this distance from the origin
pub const PATROL_RANGE: i64 = 1_500;
const PATROL_SPEED: i64 = 60;
const GUST_INTERVAL: i64 = 25;
const GUST: i64 = 400;

/// Player input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stick {
    pub direction: i8,
}

/// Rewindable body state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub position: i64,
    pub velocity: i64,
}

/// One peer's copy of the world
#[derive(Debug, Default)]
pub struct Arena {
    /// Gusts only blow on the authority, so clients mispredict them
    pub gusts: bool,
    pub held: BTreeMap<ObjectId, Stick>,
    pub applied: BTreeMap<ObjectId, Stick>,
    pub bodies: BTreeMap<ObjectId, Body>,
    pub visible: BTreeMap<ObjectId, bool>,
}

impl Arena {
    pub fn authoritative() -> Self {
        Self {
            gusts: true,
            ..Self::default()
        }
    }

    pub fn body(&self, id: ObjectId) -> Body {
        self.bodies.get(&id).copied().unwrap_or_default()
    }

    pub fn is_visible(&self, id: ObjectId) -> bool {
        self.visible.get(&id).copied().unwrap_or(true)
    }
}

impl ObjectDirectory for Arena {
    fn set_active(&mut self, object: ObjectId, active: bool) {
        self.visible.insert(object, active);
    }

    fn despawn(&mut self, object: ObjectId) {
        self.bodies.remove(&object);
        self.visible.remove(&object);
        self.held.remove(&object);
        self.applied.remove(&object);
    }
}

/// Samples and applies a player's stick
pub struct Controls(pub ObjectId);

impl InputBinding<Arena> for Controls {
    type Input = Stick;

    fn capture_input(&mut self, world: &Arena) -> Stick {
        world.held.get(&self.0).copied().unwrap_or_default()
    }

    fn apply_input(&mut self, world: &mut Arena, input: &Stick) {
        world.applied.insert(self.0, *input);
    }
}

/// Stick-driven movement
pub struct Motion(pub ObjectId);

impl StateBinding<Arena> for Motion {
    type State = Body;

    fn capture_state(&self, world: &Arena) -> Body {
        world.body(self.0)
    }

    fn apply_state(&mut self, world: &mut Arena, state: &Body) {
        world.bodies.insert(self.0, *state);
    }

    fn simulate(&mut self, world: &mut Arena, step: &mut Step<'_, Arena>) {
        let stick = world.applied.get(&self.0).copied().unwrap_or_default();
        let gust = if world.gusts && step.tick() % GUST_INTERVAL == 0 {
            GUST
        } else {
            0
        };
        let body = world.bodies.entry(self.0).or_default();
        body.velocity = i64::from(stick.direction) * SPEED + gust;
        body.position += body.velocity;
    }
}

/// Input-free back and forth movement
pub struct Patrol(pub ObjectId);

impl StateBinding<Arena> for Patrol {
    type State = Body;

    fn capture_state(&self, world: &Arena) -> Body {
        world.body(self.0)
    }

    fn apply_state(&mut self, world: &mut Arena, state: &Body) {
        world.bodies.insert(self.0, *state);
    }

    fn simulate(&mut self, world: &mut Arena, _step: &mut Step<'_, Arena>) {
        let body = world.bodies.entry(self.0).or_default();
        if body.velocity == 0 {
            body.velocity = PATROL_SPEED;
        }
        if body.position.abs() > PATROL_RANGE {
            body.velocity = -body.position.signum() * PATROL_SPEED;
        }
        body.position += body.velocity;
    }
}
