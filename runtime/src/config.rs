//! Projection daemon configuration and its startup validation (§4.8, §6).

use crate::error::{Result, RuntimeError};
use std::time::Duration;

/// Knobs governing the projection daemon's polling and rebuild behavior.
///
/// # Default Values
///
/// - `polling_interval`: 1 second
/// - `batch_size`: 500
/// - `max_concurrent_rebuilds`: 4
/// - `enable_auto_rebuild`: false
#[derive(Debug, Clone)]
pub struct ProjectionsConfig {
    /// How long the daemon sleeps between poll iterations.
    pub polling_interval: Duration,
    /// Upper bound on events folded per poll tick before persisting
    /// checkpoints and starting the next tick.
    pub batch_size: usize,
    /// Bound on concurrently running per-projection rebuilds in
    /// `RebuildAll`.
    pub max_concurrent_rebuilds: usize,
    /// Whether the daemon rebuilds a projection automatically the first
    /// time it is registered with no existing checkpoint.
    pub enable_auto_rebuild: bool,
}

impl Default for ProjectionsConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(1),
            batch_size: 500,
            max_concurrent_rebuilds: 4,
            enable_auto_rebuild: false,
        }
    }
}

impl ProjectionsConfig {
    /// Validate this configuration against the ranges fixed by the daemon's
    /// design (§4.8): `polling_interval ∈ [100ms, 1h]`,
    /// `batch_size ∈ [1, 100_000]`, `max_concurrent_rebuilds ∈ [1, 64]`.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Configuration`] if any knob is out of range.
    pub fn validate(&self) -> Result<()> {
        let min_interval = Duration::from_millis(100);
        let max_interval = Duration::from_secs(3600);
        if self.polling_interval < min_interval || self.polling_interval > max_interval {
            return Err(RuntimeError::Configuration(format!(
                "polling_interval must be between {min_interval:?} and {max_interval:?}, got {:?}",
                self.polling_interval
            )));
        }
        if self.batch_size == 0 || self.batch_size > 100_000 {
            return Err(RuntimeError::Configuration(format!(
                "batch_size must be between 1 and 100000, got {}",
                self.batch_size
            )));
        }
        if self.max_concurrent_rebuilds == 0 || self.max_concurrent_rebuilds > 64 {
            return Err(RuntimeError::Configuration(format!(
                "max_concurrent_rebuilds must be between 1 and 64, got {}",
                self.max_concurrent_rebuilds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ProjectionsConfig::default().validate().unwrap();
    }

    #[test]
    fn polling_interval_below_minimum_is_rejected() {
        let config = ProjectionsConfig {
            polling_interval: Duration::from_millis(50),
            ..ProjectionsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn polling_interval_above_maximum_is_rejected() {
        let config = ProjectionsConfig {
            polling_interval: Duration::from_secs(7200),
            ..ProjectionsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = ProjectionsConfig {
            batch_size: 0,
            ..ProjectionsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn batch_size_above_maximum_is_rejected() {
        let config = ProjectionsConfig {
            batch_size: 100_001,
            ..ProjectionsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn max_concurrent_rebuilds_out_of_range_is_rejected() {
        let too_low = ProjectionsConfig {
            max_concurrent_rebuilds: 0,
            ..ProjectionsConfig::default()
        };
        assert!(too_low.validate().is_err());

        let too_high = ProjectionsConfig {
            max_concurrent_rebuilds: 65,
            ..ProjectionsConfig::default()
        };
        assert!(too_high.validate().is_err());
    }
}
