//! Experiment tracking: run config, per-iteration metrics and media.

mod console;
mod errors;
mod local;
mod traits;

pub use console::ConsoleTracker;
pub use errors::TrackingError;
pub use local::LocalTracker;
pub use traits::{Artifact, ArtifactKind, CompositeTracker, Metrics, NoOpTracker, Tracker};
