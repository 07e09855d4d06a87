//! Error types for rewind-netcode

use crate::Role;
use rewind_core::{InputSlot, ObjectId, StateSlot};
use thiserror::Error;

/// Netcode error type
#[derive(Debug, Error)]
pub enum Error {
    /// History buffer rejected a write
    #[error(transparent)]
    Buffer(#[from] rewind_buffer::Error),

    /// Configuration or core failure
    #[error(transparent)]
    Core(#[from] rewind_core::Error),

    /// Payload or message could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Codec(#[from] bincode::Error),

    /// No object registered under this id
    #[error("Unknown object {0}")]
    UnknownObject(ObjectId),

    /// Object has no input facet at this slot
    #[error("{object} has no {slot}")]
    UnknownInput { object: ObjectId, slot: InputSlot },

    /// Object has no state facet at this slot
    #[error("{object} has no {slot}")]
    UnknownState { object: ObjectId, slot: StateSlot },

    /// Message kind is not meant for this role
    #[error("{role} does not accept {kind} messages")]
    UnexpectedMessage { role: Role, kind: &'static str },

    /// Destroy marks are decided by the authoritative peer only
    #[error("Only an authoritative peer can mark {0} for destroy")]
    NotAuthoritative(ObjectId),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Whether this is a write older than the history window
    ///
    /// Stale writes are dropped by the manager rather than reported.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            Error::Buffer(rewind_buffer::Error::StaleWrite { .. })
        )
    }
}

/// Result type for netcode operations
pub type Result<T> = std::result::Result<T, Error>;
