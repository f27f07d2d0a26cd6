//! Weighted counter selection.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::error::ConfigError;

/// Selection weights of counter types, indexed as the counters in the config.
#[derive(Clone, Debug)]
pub struct CounterWeights {
    probabilities: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl CounterWeights {
    pub fn new(probabilities: &[f64]) -> Result<Self, ConfigError> {
        let index = WeightedIndex::new(probabilities).map_err(|e| ConfigError::InvalidParameter {
            name: "selection_probability",
            reason: e.to_string(),
        })?;
        Ok(Self {
            probabilities: probabilities.to_vec(),
            index,
        })
    }

    pub fn probability(&self, counter: usize) -> f64 {
        self.probabilities[counter]
    }

    /// Returns `true` if the counter can ever be drawn.
    pub fn is_drawable(&self, counter: usize) -> bool {
        self.probabilities[counter] > 0.
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

/// Draws a counter index with probability proportional to its weight.
pub fn choose_counter<R: Rng + ?Sized>(rng: &mut R, weights: &CounterWeights) -> usize {
    weights.index.sample(rng)
}

impl Distribution<usize> for CounterWeights {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        choose_counter(rng, self)
    }
}
