use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("invalid environment config: {0}")]
    Config(String),

    #[error("action {action} is outside the action space of size {n}")]
    InvalidAction { action: usize, n: usize },

    #[error("step called before reset")]
    NotReset,

    #[error("unknown environment: {0}")]
    UnknownEnv(String),

    #[error("action count {actions} doesn't match environment count {envs}")]
    BatchMismatch { actions: usize, envs: usize },

    #[error("Environment error: {0}")]
    EnvError(#[from] Box<dyn std::error::Error + Send + Sync>),
}
