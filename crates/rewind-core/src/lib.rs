//! Rewind Core - Shared vocabulary for tick-based rewind netcode
//!
//! This crate provides the building blocks used by the history buffer and
//! the rewind manager:
//! - Tick arithmetic and a fixed-rate clock (`Tick`, `FixedClock`)
//! - Identifiers for networked objects, peers and facet slots
//! - Idempotency guard for replayed side effects (`OnceFlag`)
//! - Staged collection for mutations during iteration (`DeferredMutableSet`)
//! - Runtime configuration (`RewindConfig`)
//!
//! ## Replay-safe side effects
//!
//! A tick may be simulated many times while corrections arrive. Anything that
//! must happen once per tick (spawning, sounds, score changes) goes through a
//! [`OnceFlag`]:
//!
//! ```
//! use rewind_core::OnceFlag;
//!
//! let mut spawned = OnceFlag::new();
//! for _pass in 0..3 {
//!     if spawned.can_process(12) {
//!         spawned.acknowledge_tick(12);
//!         // spawn exactly once
//!     }
//! }
//! assert!(!spawned.can_process(12));
//! ```

mod config;
mod deferred_set;
mod error;
mod identity;
mod once_flag;
pub mod time;

pub use config::{RewindConfig, DEFAULT_DISPLAY_OFFSET, DEFAULT_HISTORY_SIZE, DEFAULT_TICK_RATE};
pub use deferred_set::{AppliedMutations, DeferredMutableSet};
pub use error::{Error, Result};
pub use identity::{InputSlot, ObjectId, PeerId, StateSlot};
pub use once_flag::OnceFlag;
pub use time::{FixedClock, Tick, TickRange};
