//! Randomness seam for the draw engine
//!
//! Any `rand::Rng` works as a source. `ScriptedSource` replays fixed
//! values so exact scenarios can be pinned down in tests and replays.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

pub trait UniformSource {
    /// Uniform value in [0, 1)
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..len`; `len` is never zero
    fn pick(&mut self, len: usize) -> usize;
}

impl<R: Rng> UniformSource for R {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn pick(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }
}

/// Deterministic generator for a seed
pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Replays queued values, then falls back to a seeded generator
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    units: VecDeque<f64>,
    picks: VecDeque<usize>,
    fallback: ChaCha8Rng,
}

impl ScriptedSource {
    pub fn new(units: impl IntoIterator<Item = f64>, picks: impl IntoIterator<Item = usize>) -> Self {
        Self {
            units: units.into_iter().collect(),
            picks: picks.into_iter().collect(),
            fallback: seeded(0),
        }
    }

    pub fn remaining_units(&self) -> usize {
        self.units.len()
    }
}

impl UniformSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        match self.units.pop_front() {
            Some(v) => v,
            None => self.fallback.next_unit(),
        }
    }

    fn pick(&mut self, len: usize) -> usize {
        match self.picks.pop_front() {
            Some(i) => i % len,
            None => self.fallback.pick(len),
        }
    }
}

/// Answers every unit draw with the same value and every pick with 0
#[derive(Debug, Clone, Copy)]
pub struct ConstantSource {
    value: f64,
}

impl ConstantSource {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl UniformSource for ConstantSource {
    fn next_unit(&mut self) -> f64 {
        self.value
    }

    fn pick(&mut self, _len: usize) -> usize {
        0
    }
}
