//! Peer roles and facet ownership

use serde::{Deserialize, Serialize};
use std::fmt;

/// The part a peer plays in the session
///
/// The rewind manager branches its scheduling on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Authoritative peer that also has a local player
    Host,
    /// Predicting, non-authoritative peer
    Client,
    /// Authoritative peer without local input
    Server,
}

impl Role {
    /// Whether this peer's simulation is ground truth
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Role::Host | Role::Server)
    }

    /// Whether this peer samples local input every tick
    pub fn has_local_input(&self) -> bool {
        matches!(self, Role::Host | Role::Client)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Host => "host",
            Role::Client => "client",
            Role::Server => "server",
        };
        f.write_str(name)
    }
}

/// Whether a facet is driven by this peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Ownership {
    /// Captured (inputs) or predicted (states) locally
    Local,
    /// Fed by commits from other peers
    #[default]
    Remote,
}

impl Ownership {
    /// Check if the facet is locally owned
    pub fn is_local(&self) -> bool {
        matches!(self, Ownership::Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Host.is_authoritative());
        assert!(Role::Host.has_local_input());
        assert!(!Role::Client.is_authoritative());
        assert!(Role::Client.has_local_input());
        assert!(Role::Server.is_authoritative());
        assert!(!Role::Server.has_local_input());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Client.to_string(), "client");
    }

    #[test]
    fn test_ownership() {
        assert!(Ownership::Local.is_local());
        assert!(!Ownership::default().is_local());
    }
}
