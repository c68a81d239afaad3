//! Session configuration and validation.

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Tuning for a [`SessionController`](crate::SessionController).
///
/// Validated once at controller construction; sessions started by
/// that controller all share it.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Pause between applying one batch and requesting the next. Keeps
    /// the request rate bounded and yields to the renderer. Default: 50 ms.
    pub throttle: Duration,
    /// Rate of the consumer loop driven by
    /// [`drive_playback`](crate::drive_playback). Default: 60.0.
    pub playback_hz: f64,
    /// Largest element-wise difference at which a seed-echoing frame
    /// still counts as the seed. Absorbs JSON float round-trip error.
    /// Default: 1e-9.
    pub echo_tolerance: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(50),
            playback_hz: 60.0,
            echo_tolerance: 1e-9,
        }
    }
}

impl SessionConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.throttle.is_zero() {
            return Err(ConfigError::ZeroThrottle);
        }
        // The reciprocal must be a representable, non-zero period:
        // subnormal rates overflow it and huge rates round it to 0ns.
        let hz = self.playback_hz;
        let period_ok = hz.is_finite()
            && hz > 0.0
            && Duration::try_from_secs_f64(1.0 / hz).is_ok_and(|p| !p.is_zero());
        if !period_ok {
            return Err(ConfigError::InvalidPlaybackRate { value: hz });
        }
        if !self.echo_tolerance.is_finite() || self.echo_tolerance < 0.0 {
            return Err(ConfigError::InvalidEchoTolerance {
                value: self.echo_tolerance,
            });
        }
        Ok(())
    }

    /// Interval between consumer-loop ticks.
    ///
    /// Falls back to the default rate's period when `playback_hz` does
    /// not pass [`validate`](Self::validate).
    pub fn playback_period(&self) -> Duration {
        match Duration::try_from_secs_f64(1.0 / self.playback_hz) {
            Ok(period) if !period.is_zero() => period,
            _ => Duration::from_secs_f64(1.0 / SessionConfig::default().playback_hz),
        }
    }
}

/// Errors detected by [`SessionConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `throttle` is zero.
    ZeroThrottle,
    /// `playback_hz` is not a finite positive rate with a non-zero,
    /// finite period.
    InvalidPlaybackRate {
        /// The invalid value.
        value: f64,
    },
    /// `echo_tolerance` is NaN, infinite, or negative.
    InvalidEchoTolerance {
        /// The invalid value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroThrottle => write!(f, "throttle must be > 0"),
            Self::InvalidPlaybackRate { value } => {
                write!(
                    f,
                    "playback_hz must be finite and > 0 with a period of at least 1ns, got {value}"
                )
            }
            Self::InvalidEchoTolerance { value } => {
                write!(f, "echo_tolerance must be finite and >= 0, got {value}")
            }
        }
    }
}

impl Error for ConfigError {}
