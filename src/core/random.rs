//! Uniform random sources and the samplers built on them.
//!
//! The engine never reaches for an ambient generator: every draw goes
//! through a [`UniformSource`] handed in at construction, so a run can be
//! replayed exactly by supplying a seeded or scripted source.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Producer of uniform draws in `[0, 1)`
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

/// Adapter turning any `rand` generator into a [`UniformSource`]
#[derive(Debug, Clone)]
pub struct RngSource<R: RngCore> {
    rng: R,
}

impl<R: RngCore> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl RngSource<StdRng> {
    /// Deterministic source for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from the operating system
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: RngCore> UniformSource for RngSource<R> {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of draws, wrapping around at the end
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    /// Create a scripted source. An empty script always yields 0.0.
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, cursor: 0 }
    }

    /// Source that returns the same value forever
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws taken so far
    pub fn draws_taken(&self) -> usize {
        self.cursor
    }
}

impl UniformSource for ScriptedSource {
    fn next_uniform(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}

/// Wraps a closure producing uniform draws
pub struct FnSource<F: FnMut() -> f64> {
    f: F,
}

impl<F: FnMut() -> f64> FnSource<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F: FnMut() -> f64> UniformSource for FnSource<F> {
    fn next_uniform(&mut self) -> f64 {
        (self.f)()
    }
}

impl<U: UniformSource + ?Sized> UniformSource for &mut U {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

impl<U: UniformSource + ?Sized> UniformSource for Box<U> {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

/// Inverse-CDF exponential draw with the given rate.
/// A non-positive rate yields an infinite duration.
pub fn sample_exponential(u: f64, rate: f64) -> f64 {
    if rate <= 0.0 {
        return f64::INFINITY;
    }
    -(1.0 - u).ln() / rate
}

/// Single Bernoulli trial with success probability `p`
pub fn bernoulli(u: f64, p: f64) -> bool {
    u < p
}

/// Patience drawn as `base × U[1 - spread, 1 + spread]`
pub fn sample_patience(u: f64, base: f64, spread: f64) -> f64 {
    base * (1.0 - spread + u * 2.0 * spread)
}
