//! Randomized intervals and delays
//!
//! Every timer in the system (registration retry, report flush, transmission
//! delay, logic-module processing delay, inactivity sweep) is drawn from a
//! [`RandomVariable`], sampled fresh for each use from a component-owned
//! [`RandomStream`]. Streams are derived from a single scenario seed so that
//! a run is fully reproducible.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Largest value any variable may take, in seconds (about 31 years)
pub const MAX_SECONDS: f64 = 1e9;

/// A random variable producing non-negative values in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RandomVariable {
    /// Always the same value
    Constant {
        /// Value in seconds
        value: f64,
    },
    /// Uniform on `[min, max)`
    Uniform {
        /// Lower bound in seconds
        min: f64,
        /// Upper bound in seconds
        max: f64,
    },
    /// Exponential with the given mean, optionally truncated at `bound`
    Exponential {
        /// Mean in seconds
        mean: f64,
        /// Upper bound in seconds (0 = unbounded)
        #[serde(default)]
        bound: f64,
    },
    /// Normal distribution, clamped at zero
    Normal {
        /// Mean in seconds
        mean: f64,
        /// Standard deviation in seconds
        std_dev: f64,
    },
}

impl Default for RandomVariable {
    fn default() -> Self {
        RandomVariable::Constant { value: 0.0 }
    }
}

impl RandomVariable {
    /// Shorthand for a constant variable
    pub const fn constant(value: f64) -> Self {
        RandomVariable::Constant { value }
    }

    /// Shorthand for a uniform variable
    pub const fn uniform(min: f64, max: f64) -> Self {
        RandomVariable::Uniform { min, max }
    }

    /// Expected value in seconds (bounded exponentials report the unbounded mean)
    pub fn mean(&self) -> f64 {
        match *self {
            RandomVariable::Constant { value } => value.max(0.0),
            RandomVariable::Uniform { min, max } => ((min + max) / 2.0).max(0.0),
            RandomVariable::Exponential { mean, .. } => mean.max(0.0),
            RandomVariable::Normal { mean, .. } => mean.max(0.0),
        }
    }

    /// Checks the parameters are usable. Every parameter must lie within
    /// `[0, MAX_SECONDS]` (a normal mean may be negative).
    pub fn validate(&self, name: &str) -> Result<(), Error> {
        let in_range = |v: f64| (0.0..=MAX_SECONDS).contains(&v);
        let ok = match *self {
            RandomVariable::Constant { value } => in_range(value),
            RandomVariable::Uniform { min, max } => in_range(min) && in_range(max) && min <= max,
            RandomVariable::Exponential { mean, bound } => {
                in_range(mean) && mean > 0.0 && in_range(bound)
            }
            RandomVariable::Normal { mean, std_dev } => {
                mean.abs() <= MAX_SECONDS && in_range(std_dev)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Config(format!("invalid random variable {name}: {self:?}")))
        }
    }

    /// Draws one value in seconds, clamped to `[0, MAX_SECONDS]`
    pub fn sample_secs<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let v = match *self {
            RandomVariable::Constant { value } => value,
            RandomVariable::Uniform { min, max } => {
                if max > min {
                    rng.gen_range(min..max)
                } else {
                    min
                }
            }
            RandomVariable::Exponential { mean, bound } if bound > 0.0 && mean > 0.0 => {
                // Inverse CDF of the exponential truncated to [0, bound]
                let u: f64 = rng.gen_range(0.0..1.0);
                -mean * (u * (-bound / mean).exp_m1()).ln_1p()
            }
            RandomVariable::Exponential { mean, .. } => match Exp::new(1.0 / mean) {
                Ok(exp) => exp.sample(rng),
                Err(_) => mean,
            },
            RandomVariable::Normal { mean, std_dev } => match Normal::new(mean, std_dev) {
                Ok(normal) => normal.sample(rng),
                Err(_) => mean,
            },
        };
        if v.is_finite() {
            v.clamp(0.0, MAX_SECONDS)
        } else {
            0.0
        }
    }
}

/// A seeded, independent random number stream owned by one component
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: StdRng,
}

impl RandomStream {
    /// Creates stream number `stream` of the scenario seeded with `seed`
    pub fn new(seed: u64, stream: u64) -> Self {
        // SplitMix64 finalizer spreads adjacent stream numbers apart.
        let mut z = seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        Self {
            rng: StdRng::seed_from_u64(z),
        }
    }

    /// Draws a duration from the given variable
    pub fn draw(&mut self, rv: &RandomVariable) -> Duration {
        let secs = rv.sample_secs(&mut self.rng);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}
