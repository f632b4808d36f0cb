//! The training run: iterate the trainer, checkpoint, and record a
//! demonstration episode after every iteration.

use crate::config::{ConfigError, DemoConfig, RunConfig};
use crate::env::shaping::{EXPLORATION_FACTOR, IDLE_PENALTY, REVISIT_PENALTY};
use crate::env::{Env, EnvError, EnvRegistry, Render, ShapedDungeon};
use crate::learner::{ActorCriticTrainer, LearnerError, TrainResult, Trainer};
use crate::render::{GifRecorder, RenderError, save_png, upscale};
use crate::tracking::{
    Artifact, CompositeTracker, ConsoleTracker, LocalTracker, Metrics, NoOpTracker, Tracker,
    TrackingError,
};
use ndarray::Array3;
use serde_json::json;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SHAPED_DUNGEON: &str = "ShapedDungeon";

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("environment: {0}")]
    Env(#[from] EnvError),

    #[error("trainer: {0}")]
    Learner(#[from] LearnerError),

    #[error("render: {0}")]
    Render(#[from] RenderError),

    #[error("tracking: {0}")]
    Tracking(#[from] TrackingError),

    #[error("run I/O: {0}")]
    Io(#[from] io::Error),

    #[error("demonstration task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub iterations: usize,
    pub last_result: Option<TrainResult>,
    pub last_checkpoint: Option<PathBuf>,
    /// Tracking directory of this run, if tracking was enabled.
    pub run_dir: Option<PathBuf>,
}

/// A recorded greedy-or-sampled episode of the current policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Demonstration {
    pub steps: usize,
    pub reward: f32,
    pub done: bool,
    pub preview: PathBuf,
    pub gif: PathBuf,
}

/// Registry with every environment the run can train on.
pub fn registry() -> EnvRegistry<ShapedDungeon> {
    let mut registry = EnvRegistry::new();
    registry.register(SHAPED_DUNGEON, ShapedDungeon::from_config);
    registry
}

fn clear_dir(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn build_tracker(config: &RunConfig) -> Result<(Box<dyn Tracker>, Option<PathBuf>), RunError> {
    if !config.tracking {
        return Ok((Box::new(NoOpTracker), None));
    }
    let local = LocalTracker::init(
        &config.tracking_dir,
        &config.project,
        config.entity.as_deref(),
    )?;
    let run_dir = local.dir().to_path_buf();
    let tracker = CompositeTracker::new(vec![Box::new(ConsoleTracker::new()), Box::new(local)]);
    Ok((Box::new(tracker), Some(run_dir)))
}

/// Plays one episode in a fresh environment with the trainer's policy.
///
/// Writes the upscaled initial frame to `preview_path` and the whole episode
/// to `gif_path`.
pub fn sample_demonstration<T>(trainer: &mut T, demo: &DemoConfig) -> Result<Demonstration, RunError>
where
    T: Trainer<Array3<f32>, usize>,
{
    let mut env = ShapedDungeon::from_config(&demo.env_config)?;
    let mut obs = env.reset()?;
    save_png(&upscale(&env.render()?, demo.frame_size), &demo.preview_path)?;

    let mut recorder = GifRecorder::new(demo.frame_size);
    let mut reward = 0.0;
    let mut done = false;
    let mut steps = 0;
    while steps < demo.max_steps {
        let action = trainer.compute_single_action(&obs)?;
        recorder.push(&env.render()?);
        let (next, rew, finished, _) = env.step(action)?;
        obs = next;
        reward += rew;
        steps += 1;
        if finished {
            done = true;
            break;
        }
    }
    recorder.write(&demo.gif_path)?;
    env.close()?;

    tracing::debug!(steps, reward, done, gif = %demo.gif_path.display(), "recorded demonstration");
    Ok(Demonstration {
        steps,
        reward,
        done,
        preview: demo.preview_path.clone(),
        gif: demo.gif_path.clone(),
    })
}

fn episode_metrics(result: &TrainResult) -> Metrics {
    [
        ("episode_reward_min", result.episode_reward_min),
        ("episode_reward_mean", result.episode_reward_mean),
        ("episode_reward_max", result.episode_reward_max),
        ("episode_len_mean", result.episode_len_mean),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub async fn run(config: RunConfig) -> Result<RunSummary, RunError> {
    config.validate()?;
    clear_dir(&config.checkpoint_root)?;

    let registry = registry();
    let (mut tracker, run_dir) = build_tracker(&config)?;
    let mut trainer = ActorCriticTrainer::new(config.trainer.clone(), &registry)?;

    tracker.log_config(&json!({
        "rollout_fragment_length": config.trainer.rollout_fragment_length,
        "entropy_coeff": config.trainer.entropy_coeff,
        "lambda": config.trainer.lambda,
        "vf_loss_coeff": config.trainer.vf_loss_coeff,
        "iterations": config.iterations,
        "TOTAL_EXPLORED_FACTOR": EXPLORATION_FACTOR,
        "IS_NOT_NEW_FINE": REVISIT_PENALTY,
        "IS_NOT_MOVED_FINE": IDLE_PENALTY,
    }))?;

    let mut summary = RunSummary {
        iterations: 0,
        last_result: None,
        last_checkpoint: None,
        run_dir,
    };

    for n in 0..config.iterations {
        let result = trainer.train().await?;
        let path = trainer.save(&config.checkpoint_root)?;
        tracing::info!(
            "{:3} reward {:6.2}/{:6.2}/{:6.2} len {:6.2} saved {}",
            n + 1,
            result.episode_reward_min,
            result.episode_reward_mean,
            result.episode_reward_max,
            result.episode_len_mean,
            path.display()
        );

        // Rendering and GIF encoding stay off the async workers.
        let demo_config = config.demo.clone();
        let (returned, demo) = tokio::task::spawn_blocking(move || {
            let demo = sample_demonstration(&mut trainer, &demo_config);
            (trainer, demo)
        })
        .await?;
        trainer = returned;
        let demo = demo?;
        tracker.log(
            (n + 1) as u64,
            &episode_metrics(&result),
            &[Artifact::video("gif", &demo.gif)],
        )?;

        summary.iterations = n + 1;
        summary.last_result = Some(result);
        summary.last_checkpoint = Some(path);
    }

    trainer.shutdown().await?;
    tracker.finish()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvConfig;
    use tempfile::tempdir;

    fn tiny_config(root: &Path) -> RunConfig {
        let mut config = RunConfig {
            iterations: 1,
            checkpoint_root: root.join("checkpoints"),
            tracking_dir: root.join("runs"),
            ..RunConfig::default()
        };
        config.trainer.num_workers = 1;
        config.trainer.rollout_fragment_length = 20;
        config.trainer.num_sgd_iter = 1;
        config.trainer.seed = Some(3);
        config.trainer.env_config = EnvConfig {
            max_steps: 10,
            ..config.trainer.env_config
        };
        config.demo.max_steps = 8;
        config.demo.frame_size = 40;
        config.demo.gif_path = root.join("out.gif");
        config.demo.preview_path = root.join("tmp.png");
        config
    }

    #[test]
    fn registry_knows_shaped_dungeon() {
        let registry = registry();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![SHAPED_DUNGEON]);
        let env = registry.make(SHAPED_DUNGEON, &EnvConfig::default()).unwrap();
        assert_eq!(env.observation_space().shape(), &[11, 11, 3]);
    }

    #[test]
    fn clearing_missing_dir_is_fine() {
        let root = tempdir().unwrap();
        clear_dir(&root.path().join("nothing-here")).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn demonstration_stops_at_step_limit() {
        let root = tempdir().unwrap();
        let config = tiny_config(root.path());
        let mut trainer = ActorCriticTrainer::new(config.trainer.clone(), &registry()).unwrap();

        let demo = sample_demonstration(&mut trainer, &config.demo).unwrap();
        assert!(demo.steps <= 8);
        assert!(demo.steps == 8 || demo.done);
        assert!(demo.preview.is_file());
        assert!(demo.gif.is_file());

        let preview = image::open(&demo.preview).unwrap();
        assert_eq!((preview.width(), preview.height()), (40, 40));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_iteration_run() {
        let root = tempdir().unwrap();
        let config = tiny_config(root.path());
        fs::create_dir_all(&config.checkpoint_root).unwrap();
        let stale = config.checkpoint_root.join("stale.json");
        fs::write(&stale, "{}").unwrap();
        let notes = root.path().join("results/user_notes.txt");
        fs::create_dir_all(notes.parent().unwrap()).unwrap();
        fs::write(&notes, "keep me").unwrap();

        let summary = run(config.clone()).await.unwrap();
        assert_eq!(summary.iterations, 1);
        assert!(!stale.exists());
        assert_eq!(fs::read_to_string(&notes).unwrap(), "keep me");

        let checkpoint = summary.last_checkpoint.unwrap();
        assert!(checkpoint.is_file());
        assert!(checkpoint.starts_with(&config.checkpoint_root));

        let result = summary.last_result.unwrap();
        assert_eq!(result.iteration, 1);
        assert!(result.policy_loss.is_finite());

        let run_dir = summary.run_dir.unwrap();
        let logged: serde_json::Value =
            serde_json::from_slice(&fs::read(run_dir.join("config.json")).unwrap()).unwrap();
        assert_eq!(logged["IS_NOT_MOVED_FINE"], 5.0);
        assert_eq!(logged["rollout_fragment_length"], 20);

        let lines = fs::read_to_string(run_dir.join("metrics.jsonl")).unwrap();
        assert_eq!(lines.lines().count(), 1);
        assert!(run_dir.join("media/gif_1.gif").is_file());
        assert!(run_dir.join("summary.json").is_file());
    }

    #[tokio::test]
    async fn run_completes_on_current_thread_runtime() {
        let root = tempdir().unwrap();
        let config = RunConfig {
            tracking: false,
            ..tiny_config(root.path())
        };
        let summary = run(config.clone()).await.unwrap();
        assert_eq!(summary.iterations, 1);
        assert!(config.demo.gif_path.is_file());
    }

    #[tokio::test]
    async fn empty_demo_is_rejected_before_training() {
        let root = tempdir().unwrap();
        let mut config = tiny_config(root.path());
        config.demo.max_steps = 0;
        assert!(matches!(
            run(config.clone()).await,
            Err(RunError::Config(ConfigError::Invalid(_)))
        ));
        assert!(!config.checkpoint_root.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn tracking_can_be_disabled() {
        let root = tempdir().unwrap();
        let config = RunConfig {
            tracking: false,
            ..tiny_config(root.path())
        };
        let summary = run(config.clone()).await.unwrap();
        assert!(summary.run_dir.is_none());
        assert!(!config.tracking_dir.exists());
    }
}
