use crate::env::EnvError;
use crate::runtime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LearnerError {
    #[error("invalid trainer config: {0}")]
    Config(String),

    #[error("observation has {got} features, policy expects {expected}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("rollout worker failed: {0}")]
    Runtime(#[from] runtime::Error),

    #[error("checkpoint I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint format: {0}")]
    Format(#[from] serde_json::Error),
}
