//! Checkout Configuration
//!
//! Timings and thresholds, with environment overrides.

use std::time::Duration;

use checkout_core::{CheckoutError, CheckoutPolicy, ClockSchedule, Result};

/// Longest accepted timing override
const MAX_DELAY_MS: u64 = 60_000;

/// Checkout timing and policy configuration
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutConfig {
    /// Interval between progress ticks
    pub tick_interval: Duration,

    /// Progress units per tick
    pub tick_step: u8,

    /// When the simulated charge resolves
    pub resolve_after: Duration,

    /// How long the success state stays up
    pub auto_close_after: Duration,

    /// Draws at or above this approve the charge
    pub success_threshold: f64,

    /// Delay before leaving the page after a successful checkout
    pub redirect_delay: Duration,

    /// Where unauthenticated users are sent
    pub auth_path: String,

    /// Where users land after subscribing
    pub home_path: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            tick_step: 10,
            resolve_after: Duration::from_millis(2500),
            auto_close_after: Duration::from_millis(2000),
            success_threshold: 0.1,
            redirect_delay: Duration::from_millis(1000),
            auth_path: "/auth".into(),
            home_path: "/".into(),
        }
    }
}

impl CheckoutConfig {
    /// Read `CHECKOUT_*` environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| -> Result<Duration> {
            lookup(key).map_or(Ok(default), |raw| {
                raw.trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|ms| *ms <= MAX_DELAY_MS)
                    .map(Duration::from_millis)
                    .ok_or_else(|| {
                        CheckoutError::Config(format!(
                            "{key} must be milliseconds up to {MAX_DELAY_MS}, got '{raw}'"
                        ))
                    })
            })
        };

        let tick_step = match lookup("CHECKOUT_TICK_STEP") {
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|step| (1..=100).contains(step))
                .ok_or_else(|| {
                    CheckoutError::Config(format!("CHECKOUT_TICK_STEP must be 1-100, got '{raw}'"))
                })?,
            None => defaults.tick_step,
        };

        let success_threshold = match lookup("CHECKOUT_SUCCESS_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| (0.0..=1.0).contains(t))
                .ok_or_else(|| {
                    CheckoutError::Config(format!(
                        "CHECKOUT_SUCCESS_THRESHOLD must be within 0-1, got '{raw}'"
                    ))
                })?,
            None => defaults.success_threshold,
        };

        Ok(Self {
            tick_interval: millis("CHECKOUT_TICK_MS", defaults.tick_interval)?,
            tick_step,
            resolve_after: millis("CHECKOUT_RESOLVE_MS", defaults.resolve_after)?,
            auto_close_after: millis("CHECKOUT_AUTO_CLOSE_MS", defaults.auto_close_after)?,
            success_threshold,
            redirect_delay: millis("CHECKOUT_REDIRECT_DELAY_MS", defaults.redirect_delay)?,
            auth_path: lookup("CHECKOUT_AUTH_PATH").unwrap_or(defaults.auth_path),
            home_path: lookup("CHECKOUT_HOME_PATH").unwrap_or(defaults.home_path),
        })
    }

    pub const fn schedule(&self) -> ClockSchedule {
        ClockSchedule {
            tick_interval: self.tick_interval,
            resolve_after: self.resolve_after,
        }
    }

    pub const fn policy(&self) -> CheckoutPolicy {
        CheckoutPolicy {
            tick_step: self.tick_step,
            success_threshold: self.success_threshold,
            auto_close_after: self.auto_close_after,
        }
    }
}
