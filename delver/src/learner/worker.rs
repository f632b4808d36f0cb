use super::errors::LearnerError;
use super::policy::LinearPolicy;
use crate::env::{Env, EnvError, Step, TrajectoryShard, VecEnv};
use ndarray::Array3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Shard = TrajectoryShard<Array3<f32>, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub reward: f32,
    pub length: u32,
}

#[derive(Debug, Default)]
pub struct Rollout {
    pub shards: Vec<Shard>,
    pub episodes: Vec<Episode>,
}

/// Owns a batch of environments and steps them with a policy snapshot.
///
/// Episodes carry over between fragments; a sub-environment is reset as soon
/// as it reports `done`.
pub struct RolloutWorker<E: Env> {
    index: usize,
    envs: VecEnv<E>,
    obs: Vec<Array3<f32>>,
    running: Vec<Episode>,
    rng: StdRng,
}

impl<E> RolloutWorker<E>
where
    E: Env<Obs = Array3<f32>, Act = usize>,
    E::Info: Serialize,
{
    pub fn new(index: usize, mut envs: VecEnv<E>, seed: u64) -> Result<Self, EnvError> {
        let obs = envs.reset()?;
        let running = vec![
            Episode {
                reward: 0.0,
                length: 0
            };
            envs.len()
        ];
        Ok(Self {
            index,
            envs,
            obs,
            running,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn envs(&self) -> &VecEnv<E> {
        &self.envs
    }

    /// Runs `fragment_length` steps in every sub-environment.
    pub fn sample(
        &mut self,
        policy: &LinearPolicy,
        version: u64,
        fragment_length: usize,
    ) -> Result<Rollout, LearnerError> {
        let n = self.envs.len();
        let mut steps: Vec<Vec<Step<Array3<f32>, usize>>> =
            (0..n).map(|_| Vec::with_capacity(fragment_length)).collect();
        let mut logps: Vec<Vec<f32>> = (0..n).map(|_| Vec::with_capacity(fragment_length)).collect();
        let mut episodes = Vec::new();

        for _ in 0..fragment_length {
            let mut actions = Vec::with_capacity(n);
            for (i, obs) in self.obs.iter().enumerate() {
                let x = policy.features(obs)?;
                let (action, logp) = policy.sample(&x, &mut self.rng);
                actions.push(action);
                logps[i].push(logp);
            }

            let results = self.envs.step(actions.clone())?;
            for (i, ((next_obs, rew, done, info), act)) in results.into_iter().zip(actions).enumerate() {
                let obs = std::mem::replace(&mut self.obs[i], next_obs);
                steps[i].push(Step {
                    obs,
                    act,
                    rew,
                    done,
                    info: serde_json::to_value(&info).unwrap_or_default(),
                });

                let running = &mut self.running[i];
                running.reward += rew;
                running.length += 1;
                if done {
                    episodes.push(*running);
                    *running = Episode {
                        reward: 0.0,
                        length: 0,
                    };
                    self.obs[i] = self.envs.reset_at(i)?;
                }
            }
        }

        let shards = steps
            .into_iter()
            .zip(logps)
            .zip(&self.obs)
            .map(|((steps, logps), last_obs)| TrajectoryShard {
                id: Uuid::new_v4().to_string(),
                steps,
                version,
                rollout_probs: Some(logps),
                last_obs: last_obs.clone(),
            })
            .collect();

        tracing::debug!(
            worker = self.index,
            version,
            episodes = episodes.len(),
            "sampled fragment"
        );
        Ok(Rollout { shards, episodes })
    }

    pub fn close(&mut self) -> Result<(), EnvError> {
        self.envs.close()
    }
}
