use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("task canceled")]
    Canceled,

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("scheduler is shut down")]
    ShutDown,
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::Canceled
    }
}
