use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("tracker I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("tracker record encoding: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("artifact {0} does not exist")]
    MissingArtifact(String),

    #[error("run already finished")]
    Finished,
}
