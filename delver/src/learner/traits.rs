use super::errors::LearnerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Summary of one training iteration.
///
/// Episode metrics cover a sliding window of recently finished episodes and
/// are NaN until the first episode ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResult {
    pub iteration: u64,
    pub episode_reward_min: f64,
    pub episode_reward_mean: f64,
    pub episode_reward_max: f64,
    pub episode_len_mean: f64,
    pub episodes_this_iter: u64,
    pub episodes_total: u64,
    pub timesteps_total: u64,
    pub policy_loss: f64,
    pub value_loss: f64,
    pub entropy: f64,
}

#[async_trait]
pub trait Trainer<O, A>: Send {
    /// Collects one round of rollouts and updates the policy on them.
    async fn train(&mut self) -> Result<TrainResult, LearnerError>;

    /// Writes a checkpoint under `checkpoint_dir` and returns its path.
    fn save(&self, checkpoint_dir: &Path) -> Result<PathBuf, LearnerError>;

    fn restore(&mut self, checkpoint: &Path) -> Result<(), LearnerError>;

    fn compute_single_action(&mut self, obs: &O) -> Result<A, LearnerError>;

    /// Stops the rollout workers and closes their environments.
    async fn shutdown(&mut self) -> Result<(), LearnerError>;
}
