//! Transport abstraction
//!
//! The manager only needs to hand messages to "the authority" or to "every
//! observer". Connection handling, reliability and fan-out belong to the
//! channel implementation.

use crate::Message;
use std::convert::Infallible;

/// Who a message is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// The authoritative peer (server or host)
    Authority,
    /// Every peer observing the session except the sender
    Observers,
}

/// Outgoing message sink
pub trait Channel {
    /// Error type for this channel
    type Error: std::error::Error + Send + Sync + 'static;

    /// Queue a message for delivery
    fn send(&mut self, recipient: Recipient, message: &Message) -> Result<(), Self::Error>;
}

/// Channel that keeps every sent message in memory
///
/// Useful for tests and for loopback setups that deliver manually.
#[derive(Debug, Default, Clone)]
pub struct Outbox {
    sent: Vec<(Recipient, Message)>,
}

impl Outbox {
    /// Create an empty outbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far
    pub fn sent(&self) -> &[(Recipient, Message)] {
        &self.sent
    }

    /// Take all messages, leaving the outbox empty
    pub fn drain(&mut self) -> Vec<(Recipient, Message)> {
        std::mem::take(&mut self.sent)
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.sent.len()
    }

    /// Check if nothing was sent
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

impl Channel for Outbox {
    type Error = Infallible;

    fn send(&mut self, recipient: Recipient, message: &Message) -> Result<(), Self::Error> {
        self.sent.push((recipient, message.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_core::ObjectId;

    #[test]
    fn test_outbox_collects_messages() {
        let mut outbox = Outbox::new();
        let message = Message::DestroyMark {
            object: ObjectId::new(1),
            tick: 5,
        };

        outbox.send(Recipient::Observers, &message).unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.sent()[0], (Recipient::Observers, message));

        let drained = outbox.drain();
        assert_eq!(drained.len(), 1);
        assert!(outbox.is_empty());
    }
}
