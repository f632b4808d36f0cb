use super::errors::TrackingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Scalar metrics keyed by name, kept sorted for stable output.
pub type Metrics = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Video,
    Image,
    File,
}

/// A file produced during a run that the tracker should keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn video(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: ArtifactKind::Video,
        }
    }
}

/// Experiment tracking backend.
pub trait Tracker: Send {
    /// Records the hyperparameters of the run.
    fn log_config(&mut self, config: &serde_json::Value) -> Result<(), TrackingError>;

    /// Records one step worth of metrics and artifacts.
    fn log(
        &mut self,
        step: u64,
        metrics: &Metrics,
        artifacts: &[Artifact],
    ) -> Result<(), TrackingError>;

    /// Flushes and closes the run.
    fn finish(&mut self) -> Result<(), TrackingError> {
        Ok(())
    }
}

/// A tracker that does nothing.
pub struct NoOpTracker;

impl Tracker for NoOpTracker {
    fn log_config(&mut self, _config: &serde_json::Value) -> Result<(), TrackingError> {
        Ok(())
    }

    fn log(
        &mut self,
        _step: u64,
        _metrics: &Metrics,
        _artifacts: &[Artifact],
    ) -> Result<(), TrackingError> {
        Ok(())
    }
}

/// Dispatches to several trackers in order.
pub struct CompositeTracker {
    trackers: Vec<Box<dyn Tracker>>,
}

impl CompositeTracker {
    pub fn new(trackers: Vec<Box<dyn Tracker>>) -> Self {
        Self { trackers }
    }

    pub fn add(&mut self, tracker: Box<dyn Tracker>) {
        self.trackers.push(tracker);
    }
}

impl Tracker for CompositeTracker {
    fn log_config(&mut self, config: &serde_json::Value) -> Result<(), TrackingError> {
        for tracker in &mut self.trackers {
            tracker.log_config(config)?;
        }
        Ok(())
    }

    fn log(
        &mut self,
        step: u64,
        metrics: &Metrics,
        artifacts: &[Artifact],
    ) -> Result<(), TrackingError> {
        for tracker in &mut self.trackers {
            tracker.log(step, metrics, artifacts)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TrackingError> {
        for tracker in &mut self.trackers {
            tracker.finish()?;
        }
        Ok(())
    }
}
