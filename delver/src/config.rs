use crate::env::EnvConfig;
use crate::learner::TrainerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for the demonstration episode recorded after every iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub env_config: EnvConfig,
    pub max_steps: usize,
    /// Side length of recorded frames in pixels.
    pub frame_size: u32,
    pub gif_path: PathBuf,
    pub preview_path: PathBuf,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            env_config: EnvConfig {
                max_room_xy: 10,
                ..EnvConfig::default()
            },
            max_steps: 500,
            frame_size: 500,
            gif_path: PathBuf::from("out.gif"),
            preview_path: PathBuf::from("tmp.png"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub project: String,
    pub entity: Option<String>,
    pub iterations: usize,
    /// Cleared at startup.
    pub checkpoint_root: PathBuf,
    pub tracking_dir: PathBuf,
    pub tracking: bool,
    pub trainer: TrainerConfig,
    pub demo: DemoConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            project: "prod-5".to_string(),
            entity: None,
            iterations: 300,
            checkpoint_root: PathBuf::from("tmp/ppo/dungeon"),
            tracking_dir: PathBuf::from("runs"),
            tracking: true,
            trainer: TrainerConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.is_empty() {
            return Err(ConfigError::Invalid("project must not be empty".into()));
        }
        if self.demo.max_steps == 0 {
            return Err(ConfigError::Invalid("demo.max_steps must be positive".into()));
        }
        if self.demo.frame_size == 0 {
            return Err(ConfigError::Invalid("demo.frame_size must be positive".into()));
        }
        self.trainer
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_reference_run() {
        let config = RunConfig::default();
        assert_eq!(config.iterations, 300);
        assert_eq!(config.checkpoint_root, PathBuf::from("tmp/ppo/dungeon"));
        assert_eq!(config.demo.max_steps, 500);
        assert_eq!(config.demo.env_config.max_room_xy, 10);
        assert_eq!(config.trainer.rollout_fragment_length, 100);
    }

    #[test]
    fn load_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{ "iterations": 3, "trainer": { "num_workers": 1, "seed": 7 } }"#,
        )
        .unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.iterations, 3);
        assert_eq!(config.trainer.num_workers, 1);
        assert_eq!(config.trainer.seed, Some(7));
        assert_eq!(config.trainer.entropy_coeff, 0.1);
        assert_eq!(config.demo, DemoConfig::default());
    }

    #[test]
    fn load_reports_bad_input() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            RunConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ iterations: ").unwrap();
        assert!(matches!(
            RunConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));

        let invalid = dir.path().join("invalid.json");
        fs::write(&invalid, r#"{ "trainer": { "num_workers": 0 } }"#).unwrap();
        assert!(matches!(
            RunConfig::load(&invalid),
            Err(ConfigError::Invalid(_))
        ));

        let empty_demo = dir.path().join("empty_demo.json");
        fs::write(&empty_demo, r#"{ "demo": { "max_steps": 0 } }"#).unwrap();
        assert!(matches!(
            RunConfig::load(&empty_demo),
            Err(ConfigError::Invalid(_))
        ));
    }
}
