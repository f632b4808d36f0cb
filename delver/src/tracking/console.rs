use super::{Artifact, Metrics, Tracker, TrackingError};

/// Reports metrics through `tracing`.
#[derive(Debug, Default)]
pub struct ConsoleTracker;

impl ConsoleTracker {
    pub fn new() -> Self {
        Self
    }
}

impl Tracker for ConsoleTracker {
    fn log_config(&mut self, config: &serde_json::Value) -> Result<(), TrackingError> {
        tracing::info!(%config, "run config");
        Ok(())
    }

    fn log(
        &mut self,
        step: u64,
        metrics: &Metrics,
        artifacts: &[Artifact],
    ) -> Result<(), TrackingError> {
        // Group output to avoid spamming lines
        let line = metrics
            .iter()
            .map(|(key, value)| format!("{key}={value:.4}"))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(step, artifacts = artifacts.len(), "{line}");
        Ok(())
    }
}
