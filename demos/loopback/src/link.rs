//! In-memory link that delivers messages a fixed number of ticks late

use rewind_netcode::{Channel, Message, Recipient, Tick};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to frame message: {0}")]
    Frame(#[from] rewind_netcode::Error),

    #[error("{0:?} is not reachable over this link")]
    Unreachable(Recipient),
}

/// One-way link towards a single kind of recipient
pub struct DelayedLink {
    accepts: Recipient,
    latency: Tick,
    now: Tick,
    in_flight: VecDeque<(Tick, Vec<u8>)>,
    sent: usize,
}

impl DelayedLink {
    pub fn new(accepts: Recipient, latency: Tick) -> Self {
        Self {
            accepts,
            latency: latency.max(0),
            now: 0,
            in_flight: VecDeque::new(),
            sent: 0,
        }
    }

    /// Stamp messages sent from now on with `tick`
    pub fn set_now(&mut self, tick: Tick) {
        self.now = tick;
    }

    /// Messages due at or before `tick`, in send order
    pub fn deliver(&mut self, tick: Tick) -> Result<Vec<Message>, LinkError> {
        let mut delivered = Vec::new();
        while self.in_flight.front().is_some_and(|(due, _)| *due <= tick) {
            if let Some((_, bytes)) = self.in_flight.pop_front() {
                delivered.push(Message::decode(&bytes)?);
            }
        }
        Ok(delivered)
    }

    /// Total bytes waiting for delivery
    pub fn bytes_in_flight(&self) -> usize {
        self.in_flight.iter().map(|(_, bytes)| bytes.len()).sum()
    }

    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl Channel for DelayedLink {
    type Error = LinkError;

    fn send(&mut self, recipient: Recipient, message: &Message) -> Result<(), Self::Error> {
        if recipient != self.accepts {
            return Err(LinkError::Unreachable(recipient));
        }
        let bytes = message.encode()?;
        self.in_flight.push_back((self.now + self.latency, bytes));
        self.sent += 1;
        Ok(())
    }
}
