use super::errors::LearnerError;
use ndarray::{Array1, Array2, Array3};
use rand::Rng;
use serde::{Deserialize, Serialize};

const MIN_PROB: f32 = 1e-8;

/// Softmax policy and value head, both linear in the flattened observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPolicy {
    pub(crate) policy_w: Array2<f32>,
    pub(crate) policy_b: Array1<f32>,
    pub(crate) value_w: Array1<f32>,
    pub(crate) value_b: f32,
}

impl LinearPolicy {
    pub fn new<R: Rng>(num_features: usize, num_actions: usize, rng: &mut R) -> Self {
        let policy_w =
            Array2::from_shape_fn((num_actions, num_features), |_| rng.gen_range(-0.01f32..0.01));
        Self {
            policy_w,
            policy_b: Array1::zeros(num_actions),
            value_w: Array1::zeros(num_features),
            value_b: 0.0,
        }
    }

    pub fn num_features(&self) -> usize {
        self.policy_w.ncols()
    }

    pub fn num_actions(&self) -> usize {
        self.policy_w.nrows()
    }

    pub fn features(&self, obs: &Array3<f32>) -> Result<Array1<f32>, LearnerError> {
        if obs.len() != self.num_features() {
            return Err(LearnerError::ShapeMismatch {
                expected: self.num_features(),
                got: obs.len(),
            });
        }
        Ok(obs.iter().copied().collect())
    }

    pub fn probs(&self, x: &Array1<f32>) -> Array1<f32> {
        softmax(&(self.policy_w.dot(x) + &self.policy_b))
    }

    pub fn value(&self, x: &Array1<f32>) -> f32 {
        self.value_w.dot(x) + self.value_b
    }

    /// Samples an action and returns it with its log-probability.
    pub fn sample<R: Rng>(&self, x: &Array1<f32>, rng: &mut R) -> (usize, f32) {
        let probs = self.probs(x);
        let u: f32 = rng.r#gen();
        let mut acc = 0.0;
        let mut action = probs.len() - 1;
        for (i, p) in probs.iter().enumerate() {
            acc += p;
            if u < acc {
                action = i;
                break;
            }
        }
        (action, probs[action].max(MIN_PROB).ln())
    }

    pub fn greedy(&self, x: &Array1<f32>) -> usize {
        let probs = self.probs(x);
        probs
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, &p)| {
                if p > best.1 { (i, p) } else { best }
            })
            .0
    }
}

pub(crate) fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

pub(crate) fn entropy(probs: &Array1<f32>) -> f32 {
    -probs
        .iter()
        .map(|&p| {
            let p = p.max(MIN_PROB);
            p * p.ln()
        })
        .sum::<f32>()
}
