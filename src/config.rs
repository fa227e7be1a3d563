//! # Limiter configuration.
//!
//! Provides [`Config`] centralized settings for the admission limiter and its reconciler.
//!
//! ## Sentinel values
//! - `sync_timeout = 0s` → no extra deadline; wait for the feed's own sync signal
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::error::ConfigError;

/// Default limit on jobs simultaneously in flight.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 25;

/// Configuration for [`MaxInFlight`](crate::MaxInFlight).
///
/// ## Field semantics
/// - `max_in_flight`: Token pool capacity (must be `>= 1`)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `sync_timeout`: Deadline for draining a feed's bootstrap replay (`0s` = none)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid sprinkling
/// sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Upper limit on the number of jobs running concurrently in the cluster.
    ///
    /// There is no "unlimited" sentinel: `0` is rejected at build time.
    pub max_in_flight: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Subscribers that lag behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Maximum time [`Reconciler::register`](crate::Reconciler::register) waits for
    /// the feed to finish its bootstrap replay.
    pub sync_timeout: Duration,
}

impl Config {
    /// Creates a config with the given limit and default values elsewhere.
    pub fn with_max_in_flight(max_in_flight: usize) -> Self {
        Self {
            max_in_flight,
            ..Self::default()
        }
    }

    /// Rejects configurations the limiter cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::MaxInFlight {
                got: self.max_in_flight,
            });
        }
        Ok(())
    }

    /// Returns the sync deadline as an `Option`.
    ///
    /// - `None` → wait for the feed's own completion signal
    /// - `Some(d)` → fail with `SyncError::Timeout` after `d`
    #[inline]
    pub fn sync_deadline(&self) -> Option<Duration> {
        if self.sync_timeout == Duration::ZERO {
            None
        } else {
            Some(self.sync_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_in_flight = 25`
    /// - `bus_capacity = 1024`
    /// - `sync_timeout = 0s` (no extra deadline)
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            bus_capacity: 1024,
            sync_timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        let cfg = Config::with_max_in_flight(0);
        assert_eq!(cfg.validate(), Err(ConfigError::MaxInFlight { got: 0 }));
    }

    #[test]
    fn sentinels() {
        let mut cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.sync_deadline(), None);

        cfg.sync_timeout = Duration::from_secs(30);
        assert_eq!(cfg.sync_deadline(), Some(Duration::from_secs(30)));
    }
}
