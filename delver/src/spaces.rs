//! Observation and action space descriptions.

use ndarray::{ArrayBase, Data, Dimension};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Continuous box with the same bounds on every element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: f32,
    pub high: f32,
    shape: Vec<usize>,
}

impl BoxSpace {
    pub fn uniform(shape: &[usize], low: f32, high: f32) -> Self {
        assert!(low <= high, "low must not exceed high");
        Self {
            low,
            high,
            shape: shape.to_vec(),
        }
    }

    /// Box with every element in `[0, 1]`.
    pub fn unit(shape: &[usize]) -> Self {
        Self::uniform(shape, 0.0, 1.0)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of scalar elements in one observation.
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn contains<S, D>(&self, value: &ArrayBase<S, D>) -> bool
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        value.shape() == self.shape.as_slice()
            && value.iter().all(|&v| v >= self.low && v <= self.high)
    }
}

/// Discrete space with n possible values: {0, 1, ..., n-1}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrete {
    pub n: usize,
}

impl Discrete {
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Discrete space must have at least 1 element");
        Self { n }
    }

    pub fn contains(&self, value: usize) -> bool {
        value < self.n
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.n)
    }
}
