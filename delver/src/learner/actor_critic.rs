//! Reference trainer: clipped-surrogate actor-critic on a linear policy.
//!
//! Rollout workers step their environments in parallel on the runtime
//! scheduler. The trainer then computes GAE(lambda) advantages and runs a few
//! epochs of full-batch gradient steps.

use super::errors::LearnerError;
use super::policy::{LinearPolicy, entropy};
use super::stats::EpisodeWindow;
use super::traits::{TrainResult, Trainer};
use super::worker::{RolloutWorker, Shard};
use crate::delver_task;
use crate::env::{Env, EnvConfig, EnvRegistry, Seed, StepInfo, VecEnv};
use crate::runtime::{LocalScheduler, Scheduler, SchedulerConfig};
use async_trait::async_trait;
use futures::future::join_all;
use ndarray::{Array1, Array2, Array3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CHECKPOINT_FILE: &str = "policy.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Registered environment name.
    pub env: String,
    pub env_config: EnvConfig,
    pub num_workers: usize,
    pub num_envs_per_worker: usize,
    pub rollout_fragment_length: usize,
    pub gamma: f32,
    pub lambda: f32,
    pub entropy_coeff: f32,
    pub vf_loss_coeff: f32,
    pub clip_param: f32,
    pub lr: f32,
    pub num_sgd_iter: usize,
    pub explore: bool,
    /// Reseeds every sub-environment with `seed + index` when set. Otherwise
    /// environments keep the seed they were built with.
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            env: "ShapedDungeon".to_string(),
            env_config: EnvConfig {
                max_room_xy: 10,
                ..EnvConfig::default()
            },
            num_workers: 2,
            num_envs_per_worker: 1,
            rollout_fragment_length: 100,
            gamma: 0.99,
            lambda: 0.95,
            entropy_coeff: 0.1,
            vf_loss_coeff: 1.0,
            clip_param: 0.3,
            lr: 1e-3,
            num_sgd_iter: 4,
            explore: true,
            seed: None,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<(), LearnerError> {
        if self.num_workers == 0 || self.num_envs_per_worker == 0 {
            return Err(LearnerError::Config(
                "need at least one worker with one environment".into(),
            ));
        }
        if self.rollout_fragment_length == 0 {
            return Err(LearnerError::Config(
                "rollout_fragment_length must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.gamma) || !(0.0..=1.0).contains(&self.lambda) {
            return Err(LearnerError::Config(
                "gamma and lambda must be in [0, 1]".into(),
            ));
        }
        if self.lr <= 0.0 {
            return Err(LearnerError::Config("lr must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    iteration: u64,
    timesteps_total: u64,
    episodes_total: u64,
    config: TrainerConfig,
    policy: LinearPolicy,
}

/// One training sample after advantage estimation.
struct Sample {
    x: Array1<f32>,
    action: usize,
    old_logp: f32,
    advantage: f32,
    target: f32,
}

#[derive(Debug, Default, Clone, Copy)]
struct Losses {
    policy: f64,
    value: f64,
    entropy: f64,
}

pub struct ActorCriticTrainer<E: Env> {
    config: TrainerConfig,
    policy: LinearPolicy,
    workers: Vec<RolloutWorker<E>>,
    scheduler: LocalScheduler,
    window: EpisodeWindow,
    rng: StdRng,
    iteration: u64,
    episodes_total: u64,
    timesteps_total: u64,
}

impl<E> ActorCriticTrainer<E>
where
    E: Env<Obs = Array3<f32>, Act = usize, Info = StepInfo> + Seed + 'static,
{
    pub fn new(config: TrainerConfig, registry: &EnvRegistry<E>) -> Result<Self, LearnerError> {
        config.validate()?;
        let factory = registry.get(&config.env)?;

        let mut workers = Vec::with_capacity(config.num_workers);
        for w in 0..config.num_workers {
            let mut envs = VecEnv::new(|_| factory(&config.env_config), config.num_envs_per_worker)?;
            if let Some(seed) = config.seed {
                for (i, env) in envs.iter_mut().enumerate() {
                    env.seed(seed + (w * config.num_envs_per_worker + i) as u64);
                }
            }
            let worker_seed = config.seed.unwrap_or(0) + 1000 + w as u64;
            workers.push(RolloutWorker::new(w, envs, worker_seed)?);
        }

        let probe = &workers[0];
        let num_features = probe
            .envs()
            .observation_space()
            .map(|space| space.num_elements())
            .ok_or_else(|| LearnerError::Config("worker has no environments".into()))?;
        let num_actions = probe
            .envs()
            .action_space()
            .map(|space| space.n)
            .ok_or_else(|| LearnerError::Config("worker has no environments".into()))?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let policy = LinearPolicy::new(num_features, num_actions, &mut rng);
        let scheduler = LocalScheduler::with_config(SchedulerConfig {
            workers: Some(config.num_workers),
        });

        tracing::info!(
            env = %config.env,
            workers = config.num_workers,
            envs_per_worker = config.num_envs_per_worker,
            num_features,
            num_actions,
            "trainer ready"
        );

        Ok(Self {
            config,
            policy,
            workers,
            scheduler,
            window: EpisodeWindow::default(),
            rng,
            iteration: 0,
            episodes_total: 0,
            timesteps_total: 0,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn policy(&self) -> &LinearPolicy {
        &self.policy
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    async fn collect(&mut self) -> Result<Vec<Shard>, LearnerError> {
        let snapshot = Arc::new(self.policy.clone());
        let version = self.iteration;
        let fragment = self.config.rollout_fragment_length;

        let handles: Vec<_> = self
            .workers
            .drain(..)
            .map(|mut worker| {
                let policy = snapshot.clone();
                self.scheduler.submit(delver_task!(move || {
                    let rollout = worker.sample(&policy, version, fragment);
                    (worker, rollout)
                }))
            })
            .collect();

        // Every surviving worker goes back into the pool before any error is
        // reported.
        let mut rollouts = Vec::with_capacity(handles.len());
        let mut failed = None;
        for joined in join_all(handles).await {
            match joined {
                Ok((worker, rollout)) => {
                    self.workers.push(worker);
                    rollouts.push(rollout);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "rollout task failed");
                    failed.get_or_insert(e);
                }
            }
        }
        self.workers.sort_by_key(RolloutWorker::index);
        if let Some(e) = failed {
            return Err(e.into());
        }

        let mut shards = Vec::new();
        for rollout in rollouts {
            let rollout = rollout?;
            self.episodes_total += rollout.episodes.len() as u64;
            for episode in rollout.episodes {
                self.window.push(episode);
            }
            shards.extend(rollout.shards);
        }
        Ok(shards)
    }

    fn advantages(&self, shards: &[Shard]) -> Result<Vec<Sample>, LearnerError> {
        let gamma = self.config.gamma;
        let lambda = self.config.lambda;
        let mut samples = Vec::with_capacity(shards.iter().map(Shard::len).sum());

        for shard in shards {
            let xs = shard
                .steps
                .iter()
                .map(|step| self.policy.features(&step.obs))
                .collect::<Result<Vec<_>, _>>()?;
            let values: Vec<f32> = xs.iter().map(|x| self.policy.value(x)).collect();
            let bootstrap = self.policy.value(&self.policy.features(&shard.last_obs)?);
            let logps = shard.rollout_probs.as_deref().unwrap_or(&[]);

            let mut advantages = vec![0.0; xs.len()];
            let mut gae = 0.0;
            for t in (0..xs.len()).rev() {
                let step = &shard.steps[t];
                let nonterminal = if step.done { 0.0 } else { 1.0 };
                let next_value = values.get(t + 1).copied().unwrap_or(bootstrap);
                let delta = step.rew + gamma * next_value * nonterminal - values[t];
                gae = delta + gamma * lambda * nonterminal * gae;
                advantages[t] = gae;
            }

            for (t, x) in xs.into_iter().enumerate() {
                samples.push(Sample {
                    x,
                    action: shard.steps[t].act,
                    old_logp: logps.get(t).copied().unwrap_or(0.0),
                    advantage: advantages[t],
                    target: advantages[t] + values[t],
                });
            }
        }

        let n = samples.len().max(1) as f32;
        let mean = samples.iter().map(|s| s.advantage).sum::<f32>() / n;
        let var = samples
            .iter()
            .map(|s| (s.advantage - mean).powi(2))
            .sum::<f32>()
            / n;
        let std = var.sqrt().max(1e-6);
        for sample in &mut samples {
            sample.advantage = (sample.advantage - mean) / std;
        }
        Ok(samples)
    }

    /// One full-batch gradient step on the clipped surrogate, the entropy
    /// bonus and the value regression.
    fn sgd_step(&mut self, samples: &[Sample]) -> Losses {
        let num_actions = self.policy.num_actions();
        let num_features = self.policy.num_features();
        let clip = self.config.clip_param;
        let mut grad_w = Array2::<f32>::zeros((num_actions, num_features));
        let mut grad_b = Array1::<f32>::zeros(num_actions);
        let mut grad_vw = Array1::<f32>::zeros(num_features);
        let mut grad_vb = 0.0f32;
        let mut losses = Losses::default();

        for sample in samples {
            let probs = self.policy.probs(&sample.x);
            let h = entropy(&probs);
            let logp = probs[sample.action].max(1e-8).ln();
            let ratio = (logp - sample.old_logp).exp();
            let adv = sample.advantage;
            let clipped = ratio.clamp(1.0 - clip, 1.0 + clip);
            let surrogate = (ratio * adv).min(clipped * adv);

            // d(surrogate)/d(logp) is zero once the clipped branch wins.
            let active = ratio * adv <= clipped * adv;
            let pg_scale = if active { ratio * adv } else { 0.0 };

            let mut g_logits = Array1::<f32>::zeros(num_actions);
            for k in 0..num_actions {
                let onehot = if k == sample.action { 1.0 } else { 0.0 };
                let log_pk = probs[k].max(1e-8).ln();
                g_logits[k] = pg_scale * (onehot - probs[k])
                    - self.config.entropy_coeff * probs[k] * (log_pk + h);
            }
            for k in 0..num_actions {
                grad_w
                    .row_mut(k)
                    .scaled_add(g_logits[k], &sample.x);
            }
            grad_b += &g_logits;

            let v_err = self.policy.value(&sample.x) - sample.target;
            grad_vw.scaled_add(v_err, &sample.x);
            grad_vb += v_err;

            losses.policy -= surrogate as f64;
            losses.value += 0.5 * (v_err as f64).powi(2);
            losses.entropy += h as f64;
        }

        let n = samples.len().max(1) as f32;
        let lr = self.config.lr;
        let vf_scale = lr * self.config.vf_loss_coeff / n;
        self.policy.policy_w.scaled_add(lr / n, &grad_w);
        self.policy.policy_b.scaled_add(lr / n, &grad_b);
        self.policy.value_w.scaled_add(-vf_scale, &grad_vw);
        self.policy.value_b -= vf_scale * grad_vb;

        let n = n as f64;
        Losses {
            policy: losses.policy / n,
            value: losses.value / n,
            entropy: losses.entropy / n,
        }
    }
}

#[async_trait]
impl<E> Trainer<Array3<f32>, usize> for ActorCriticTrainer<E>
where
    E: Env<Obs = Array3<f32>, Act = usize, Info = StepInfo> + Seed + 'static,
{
    async fn train(&mut self) -> Result<TrainResult, LearnerError> {
        let episodes_before = self.episodes_total;
        let shards = self.collect().await?;
        let samples = self.advantages(&shards)?;
        self.timesteps_total += samples.len() as u64;

        let mut losses = Losses::default();
        for _ in 0..self.config.num_sgd_iter {
            losses = self.sgd_step(&samples);
        }
        self.iteration += 1;

        let summary = self.window.summary();
        tracing::debug!(
            iteration = self.iteration,
            samples = samples.len(),
            policy_loss = losses.policy,
            value_loss = losses.value,
            entropy = losses.entropy,
            "policy updated"
        );

        Ok(TrainResult {
            iteration: self.iteration,
            episode_reward_min: summary.reward_min,
            episode_reward_mean: summary.reward_mean,
            episode_reward_max: summary.reward_max,
            episode_len_mean: summary.len_mean,
            episodes_this_iter: self.episodes_total - episodes_before,
            episodes_total: self.episodes_total,
            timesteps_total: self.timesteps_total,
            policy_loss: losses.policy,
            value_loss: losses.value,
            entropy: losses.entropy,
        })
    }

    fn save(&self, checkpoint_dir: &Path) -> Result<PathBuf, LearnerError> {
        let dir = checkpoint_dir.join(format!("checkpoint_{:06}", self.iteration));
        fs::create_dir_all(&dir)?;
        let path = dir.join(CHECKPOINT_FILE);
        let checkpoint = Checkpoint {
            iteration: self.iteration,
            timesteps_total: self.timesteps_total,
            episodes_total: self.episodes_total,
            config: self.config.clone(),
            policy: self.policy.clone(),
        };
        fs::write(&path, serde_json::to_vec(&checkpoint)?)?;
        tracing::debug!(path = %path.display(), iteration = self.iteration, "saved checkpoint");
        Ok(path)
    }

    fn restore(&mut self, checkpoint: &Path) -> Result<(), LearnerError> {
        let path = if checkpoint.is_dir() {
            checkpoint.join(CHECKPOINT_FILE)
        } else {
            checkpoint.to_path_buf()
        };
        let loaded: Checkpoint = serde_json::from_slice(&fs::read(&path)?)?;
        if loaded.policy.num_features() != self.policy.num_features()
            || loaded.policy.num_actions() != self.policy.num_actions()
        {
            return Err(LearnerError::ShapeMismatch {
                expected: self.policy.num_features(),
                got: loaded.policy.num_features(),
            });
        }
        self.policy = loaded.policy;
        self.iteration = loaded.iteration;
        self.timesteps_total = loaded.timesteps_total;
        self.episodes_total = loaded.episodes_total;
        tracing::info!(path = %path.display(), iteration = self.iteration, "restored checkpoint");
        Ok(())
    }

    fn compute_single_action(&mut self, obs: &Array3<f32>) -> Result<usize, LearnerError> {
        let x = self.policy.features(obs)?;
        if self.config.explore {
            Ok(self.policy.sample(&x, &mut self.rng).0)
        } else {
            Ok(self.policy.greedy(&x))
        }
    }

    async fn shutdown(&mut self) -> Result<(), LearnerError> {
        for worker in &mut self.workers {
            worker.close()?;
        }
        self.workers.clear();
        Ok(())
    }
}
