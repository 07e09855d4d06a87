//! World-side hooks for object lifecycle

use rewind_core::ObjectId;

/// Lets the manager toggle and remove objects in the host world
///
/// Aliveness is replayed like any other state: an object marked for
/// destruction at tick `d` is inactive while simulating or displaying any
/// tick at or after `d`, and active again when rewinding before it.
pub trait ObjectDirectory {
    /// Show or hide an object for the tick about to be simulated or displayed
    fn set_active(&mut self, object: ObjectId, active: bool);

    /// Remove an object for good once its destroy mark left the history window
    fn despawn(&mut self, object: ObjectId);
}
