//! Wire messages exchanged between peers
//!
//! Facet payloads are opaque bytes produced by the owning track, so the
//! manager can route messages without knowing any game types.

use crate::Result;
use rewind_core::{InputSlot, ObjectId, PeerId, StateSlot, Tick};
use serde::{Deserialize, Serialize};

/// One state facet's snapshot inside a [`Message::StateCommit`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Object the state belongs to
    pub object: ObjectId,
    /// State facet on that object
    pub slot: StateSlot,
    /// Encoded state
    pub payload: Vec<u8>,
}

/// Messages sent over a [`Channel`](crate::Channel)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Input sampled by its owner, sent to the authority
    InputCommit {
        sender: PeerId,
        object: ObjectId,
        slot: InputSlot,
        tick: Tick,
        payload: Vec<u8>,
    },
    /// Authoritative states produced while simulating one tick
    StateCommit { tick: Tick, states: Vec<StateEntry> },
    /// Object stops existing at `tick`
    DestroyMark { object: ObjectId, tick: Tick },
}

impl Message {
    /// Short name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Message::InputCommit { .. } => "input-commit",
            Message::StateCommit { .. } => "state-commit",
            Message::DestroyMark { .. } => "destroy-mark",
        }
    }

    /// Tick the message refers to
    pub fn tick(&self) -> Tick {
        match self {
            Message::InputCommit { tick, .. }
            | Message::StateCommit { tick, .. }
            | Message::DestroyMark { tick, .. } => *tick,
        }
    }

    /// Serialize for the wire
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from the wire
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_and_tick() {
        let message = Message::DestroyMark {
            object: ObjectId::new(3),
            tick: 42,
        };
        assert_eq!(message.kind(), "destroy-mark");
        assert_eq!(message.tick(), 42);
    }

    #[test]
    fn test_state_commit_wire_format() {
        let message = Message::StateCommit {
            tick: 7,
            states: vec![
                StateEntry {
                    object: ObjectId::new(1),
                    slot: StateSlot(0),
                    payload: vec![1, 2, 3],
                },
                StateEntry {
                    object: ObjectId::new(2),
                    slot: StateSlot(1),
                    payload: vec![],
                },
            ],
        };

        let bytes = message.encode().unwrap();
        assert_eq!(Message::decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = Message::decode(&[0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(crate::Error::Codec(_))));
    }
}
