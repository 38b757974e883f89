//! Random Sources

use rand::Rng;

use crate::ports::RandomSource;

/// Thread-local RNG draws
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&self) -> f64 {
        rand::thread_rng().r#gen::<f64>()
    }
}

/// Always returns the same value, for deterministic resolutions
#[derive(Clone, Copy, Debug)]
pub struct FixedRandom(f64);

impl FixedRandom {
    /// Clamped into `[0, 1)`
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0 - f64::EPSILON))
    }

    /// A draw that always approves under the default policy
    pub fn approving() -> Self {
        Self::new(0.5)
    }

    /// A draw that always declines under the default policy
    pub fn declining() -> Self {
        Self::new(0.05)
    }
}

impl RandomSource for FixedRandom {
    fn draw(&self) -> f64 {
        self.0
    }
}
