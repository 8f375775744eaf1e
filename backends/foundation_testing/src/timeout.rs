//! Deadline scaling for slow execution environments.
//!
//! Tests write their deadlines as literal durations and pass them through
//! [`timeout_secs`] / [`timeout_millis`]. Setting the
//! `TIMEOUT_SCALE_MULTIPLIER` environment variable to a positive integer
//! widens every such deadline by that factor without touching test logic.

use core::time::Duration;
use std::env;
use std::sync::OnceLock;

/// Environment variable holding the deadline multiplier.
pub const SCALE_ENV_VAR: &str = "TIMEOUT_SCALE_MULTIPLIER";

/// A multiplier applied to test deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutScale {
    factor: u32,
}

impl TimeoutScale {
    /// A scale that leaves durations unchanged.
    pub const IDENTITY: Self = Self { factor: 1 };

    /// Creates a scale with the given factor; zero is treated as one.
    #[must_use]
    pub const fn new(factor: u32) -> Self {
        if factor == 0 {
            Self::IDENTITY
        } else {
            Self { factor }
        }
    }

    /// Reads the factor from `TIMEOUT_SCALE_MULTIPLIER`.
    ///
    /// A missing variable yields the identity scale. A value that is not a
    /// positive integer is logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        match env::var(SCALE_ENV_VAR) {
            Ok(raw) => Self::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "ignoring invalid {SCALE_ENV_VAR}");
                Self::IDENTITY
            }),
            Err(_) => Self::IDENTITY,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().parse::<u32>() {
            Ok(factor) if factor > 0 => Some(Self { factor }),
            _ => None,
        }
    }

    /// Returns the multiplier.
    #[must_use]
    pub const fn factor(&self) -> u32 {
        self.factor
    }

    /// Multiplies `duration` by the factor, saturating on overflow.
    #[must_use]
    pub fn scale(&self, duration: Duration) -> Duration {
        duration.saturating_mul(self.factor)
    }
}

impl Default for TimeoutScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn process_scale() -> TimeoutScale {
    static SCALE: OnceLock<TimeoutScale> = OnceLock::new();
    *SCALE.get_or_init(|| {
        let scale = TimeoutScale::from_env();
        tracing::debug!(factor = scale.factor(), "test timeout scale");
        scale
    })
}

/// Returns the process-wide multiplier, read once from the environment.
#[must_use]
pub fn scale_factor() -> u32 {
    process_scale().factor()
}

/// Scales `duration` by the process-wide multiplier.
#[must_use]
pub fn scale_timeout(duration: Duration) -> Duration {
    process_scale().scale(duration)
}

/// A scaled deadline of `secs` seconds.
#[must_use]
pub fn timeout_secs(secs: u64) -> Duration {
    scale_timeout(Duration::from_secs(secs))
}

/// A scaled deadline of `millis` milliseconds.
#[must_use]
pub fn timeout_millis(millis: u64) -> Duration {
    scale_timeout(Duration::from_millis(millis))
}
