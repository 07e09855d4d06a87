//! Error types for rewind-buffer

use rewind_core::Tick;
use thiserror::Error;

/// Buffer error type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Write targets a tick that already fell out of the history window
    #[error("Cannot write tick {tick}, oldest retained tick is {oldest}")]
    StaleWrite { tick: Tick, oldest: Tick },
}

/// Result type for buffer operations
pub type Result<T> = std::result::Result<T, Error>;
