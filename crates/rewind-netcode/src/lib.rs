//! Rewind Netcode - Rollback netcode through deterministic resimulation
//!
//! Every networked object is split into facets:
//!
//! - **Inputs**: sampled by their owner each tick and sent to the authority
//! - **States**: saved after each simulated tick, committed by the authority
//!   and corrected on predicting peers
//!
//! Facets keep a [`TickHistoryBuffer`](rewind_buffer::TickHistoryBuffer) of
//! their values. When late inputs or authoritative states arrive, the
//! [`RewindManager`] restores the world to the affected tick and simulates
//! forward again up to the present, then restores a slightly delayed display
//! tick for presentation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐   InputCommit   ┌──────────────────────────┐
//! │          Client          │ ──────────────▶ │      Server / Host       │
//! │  capture ─▶ predict      │                 │  replay from earliest    │
//! │  replay from correction  │ ◀────────────── │  new input, commit state │
//! └──────────────────────────┘   StateCommit   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rewind_netcode::{InputTrack, Outbox, RewindManager, RewindableObject, Role, StateTrack};
//!
//! let mut manager = RewindManager::new(Role::Host, RewindConfig::default());
//! let mut player = RewindableObject::new(ObjectId::new(1));
//! let stick = player.add_input(InputTrack::local(Stick));
//! player.add_state(StateTrack::local(Body), Some(stick))?;
//! manager.register(&world, player);
//!
//! loop {
//!     for message in receive() {
//!         manager.handle_message(&message)?;
//!     }
//!     let report = manager.tick(&mut world, clock.advance(), clock.delta(), &mut channel);
//!     render(&world, report.display_tick);
//! }
//! ```

mod directory;
mod error;
mod facet;
mod hooks;
mod input_track;
mod manager;
mod message;
mod object;
mod role;
mod state_track;
mod step;
mod transport;

pub use directory::ObjectDirectory;
pub use error::{Error, Result};
pub use facet::{Behaviour, InputBinding, RewindableInput, RewindableState, StateBinding};
pub use hooks::RewindHooks;
pub use input_track::InputTrack;
pub use manager::{RewindManager, TickReport};
pub use message::{Message, StateEntry};
pub use object::RewindableObject;
pub use role::{Ownership, Role};
pub use state_track::{BehaviourTrack, StateTrack};
pub use step::{Commands, Step};
pub use transport::{Channel, Outbox, Recipient};

// Re-export core types for convenience
pub use rewind_core::{ObjectId, PeerId, RewindConfig, Tick};
