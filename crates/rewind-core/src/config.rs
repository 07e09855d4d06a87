//! Rewind Configuration - History length, display lag and tick rate
//!
//! The configuration is consumed read-only by the rewind manager. It can be
//! built in code or loaded from a RON document:
//!
//! ```ron
//! (
//!     history_size: 64,
//!     display_offset: 2,
//!     tick_rate: 30,
//! )
//! ```

use crate::{Error, Result, Tick};
use serde::{Deserialize, Serialize};

/// Default number of ticks kept in every history buffer
pub const DEFAULT_HISTORY_SIZE: usize = 64;

/// Default display lag in ticks
pub const DEFAULT_DISPLAY_OFFSET: Tick = 2;

/// Default ticks per second
pub const DEFAULT_TICK_RATE: u32 = 30;

/// Configuration for the rewind manager
///
/// # Example
///
/// ```
/// use rewind_core::RewindConfig;
///
/// let config = RewindConfig::from_ron("(history_size: 8, display_offset: 2, tick_rate: 60)").unwrap();
/// assert_eq!(config.history_size(), 8);
/// assert_eq!(config.display_offset(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewindConfig {
    /// Capacity of every history buffer, in ticks
    ///
    /// Bounds how far back a correction can rewind. Objects marked for
    /// destruction are only despawned once their destroy tick falls out of
    /// this window.
    history_size: usize,
    /// How many ticks the displayed state lags behind the simulated tick
    display_offset: Tick,
    /// Ticks per second of the external fixed clock
    tick_rate: u32,
}

impl RewindConfig {
    /// Create a validated configuration
    pub fn new(history_size: usize, display_offset: Tick, tick_rate: u32) -> Result<Self> {
        let config = Self {
            history_size,
            display_offset,
            tick_rate,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from RON
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> String {
        // Plain struct of integers; serialization cannot fail
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).unwrap_or_default()
    }

    /// Check the invariants the manager relies on
    pub fn validate(&self) -> Result<()> {
        if self.history_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "history_size must be at least 2, got {}",
                self.history_size
            )));
        }
        if self.display_offset < 0 || self.display_offset as usize >= self.history_size {
            return Err(Error::InvalidConfig(format!(
                "display_offset must be in [0, {}), got {}",
                self.history_size, self.display_offset
            )));
        }
        if self.tick_rate == 0 {
            return Err(Error::InvalidConfig("tick_rate must be positive".to_string()));
        }
        Ok(())
    }

    /// History buffer capacity in ticks
    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// Display lag in ticks
    pub fn display_offset(&self) -> Tick {
        self.display_offset
    }

    /// Ticks per second
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Seconds per tick
    pub fn fixed_delta(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

impl Default for RewindConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            display_offset: DEFAULT_DISPLAY_OFFSET,
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RewindConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_size(), 64);
        assert_eq!(config.display_offset(), 2);
    }

    #[test]
    fn test_from_ron_partial() {
        let config = RewindConfig::from_ron("(history_size: 16)").unwrap();
        assert_eq!(config.history_size(), 16);
        assert_eq!(config.display_offset(), DEFAULT_DISPLAY_OFFSET);
        assert_eq!(config.tick_rate(), DEFAULT_TICK_RATE);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = RewindConfig::new(8, 3, 60).unwrap();
        let parsed = RewindConfig::from_ron(&config.to_ron()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_offset_outside_history() {
        assert!(matches!(
            RewindConfig::new(8, 8, 30),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            RewindConfig::new(8, -1, 30),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_tiny_history_and_zero_rate() {
        assert!(RewindConfig::new(1, 0, 30).is_err());
        assert!(RewindConfig::new(8, 2, 0).is_err());
    }

    #[test]
    fn test_malformed_ron() {
        assert!(matches!(
            RewindConfig::from_ron("(history_size: \"lots\")"),
            Err(Error::Ron(_))
        ));
    }

    #[test]
    fn test_fixed_delta() {
        let config = RewindConfig::new(8, 2, 50).unwrap();
        assert!((config.fixed_delta() - 0.02).abs() < f32::EPSILON);
    }
}
