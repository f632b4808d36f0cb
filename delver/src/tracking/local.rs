use super::{Artifact, Metrics, Tracker, TrackingError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MEDIA_DIR: &str = "media";

#[derive(Debug, Serialize)]
struct RunInfo<'a> {
    id: &'a str,
    project: &'a str,
    entity: Option<&'a str>,
    started_at: DateTime<Utc>,
}

/// File-backed run tracker.
///
/// Layout of a run directory:
///
/// ```text
/// <root>/<project>/<run-id>/
///     run.json        id, project, entity, start time
///     config.json     hyperparameters
///     metrics.jsonl   one object per logged step
///     media/          copied artifacts, suffixed with their step
///     summary.json    last metrics, written by finish()
/// ```
pub struct LocalTracker {
    id: String,
    dir: PathBuf,
    metrics: BufWriter<File>,
    last: Map<String, Value>,
    finished: bool,
}

impl LocalTracker {
    pub fn init(root: &Path, project: &str, entity: Option<&str>) -> Result<Self, TrackingError> {
        let started_at = Utc::now();
        let id = format!(
            "run-{}-{}",
            started_at.format("%Y%m%d_%H%M%S"),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let dir = root.join(project).join(&id);
        fs::create_dir_all(dir.join(MEDIA_DIR))?;

        let info = RunInfo {
            id: &id,
            project,
            entity,
            started_at,
        };
        fs::write(dir.join("run.json"), serde_json::to_vec_pretty(&info)?)?;
        let metrics = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("metrics.jsonl"))?;

        tracing::info!(run = %id, dir = %dir.display(), "tracking run started");
        Ok(Self {
            id,
            dir,
            metrics: BufWriter::new(metrics),
            last: Map::new(),
            finished: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn store_artifact(&self, step: u64, artifact: &Artifact) -> Result<String, TrackingError> {
        if !artifact.path.is_file() {
            return Err(TrackingError::MissingArtifact(
                artifact.path.display().to_string(),
            ));
        }
        let file_name = match artifact.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}_{step}.{ext}", artifact.name),
            None => format!("{}_{step}", artifact.name),
        };
        let relative = format!("{MEDIA_DIR}/{file_name}");
        fs::copy(&artifact.path, self.dir.join(&relative))?;
        Ok(relative)
    }
}

impl Tracker for LocalTracker {
    fn log_config(&mut self, config: &Value) -> Result<(), TrackingError> {
        fs::write(self.dir.join("config.json"), serde_json::to_vec_pretty(config)?)?;
        Ok(())
    }

    fn log(
        &mut self,
        step: u64,
        metrics: &Metrics,
        artifacts: &[Artifact],
    ) -> Result<(), TrackingError> {
        if self.finished {
            return Err(TrackingError::Finished);
        }
        let mut record = Map::new();
        record.insert("_step".into(), json!(step));
        record.insert("_timestamp".into(), json!(Utc::now().to_rfc3339()));
        for (key, value) in metrics {
            // Non-finite values become null.
            record.insert(key.clone(), json!(value));
        }
        for artifact in artifacts {
            let stored = self.store_artifact(step, artifact)?;
            record.insert(
                artifact.name.clone(),
                json!({ "_type": artifact.kind, "path": stored }),
            );
        }

        serde_json::to_writer(&mut self.metrics, &record)?;
        self.metrics.write_all(b"\n")?;
        self.metrics.flush()?;
        self.last = record;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TrackingError> {
        if self.finished {
            return Ok(());
        }
        self.metrics.flush()?;
        let mut summary = self.last.clone();
        summary.insert("_finished_at".into(), json!(Utc::now().to_rfc3339()));
        fs::write(
            self.dir.join("summary.json"),
            serde_json::to_vec_pretty(&summary)?,
        )?;
        self.finished = true;
        tracing::info!(run = %self.id, "tracking run finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::ArtifactKind;
    use tempfile::tempdir;

    fn metrics(pairs: &[(&str, f64)]) -> Metrics {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn writes_run_layout() {
        let root = tempdir().unwrap();
        let mut tracker = LocalTracker::init(root.path(), "prod-5", Some("team")).unwrap();
        assert!(tracker.dir().starts_with(root.path().join("prod-5")));

        tracker
            .log_config(&json!({ "entropy_coeff": 0.1, "iterations": 300 }))
            .unwrap();

        let gif = root.path().join("out.gif");
        fs::write(&gif, b"GIF89a").unwrap();
        tracker
            .log(
                1,
                &metrics(&[("episode_reward_mean", 1.5), ("episode_len_mean", f64::NAN)]),
                &[Artifact::video("gif", &gif)],
            )
            .unwrap();
        tracker
            .log(2, &metrics(&[("episode_reward_mean", 2.5)]), &[])
            .unwrap();
        tracker.finish().unwrap();

        let config: Value =
            serde_json::from_slice(&fs::read(tracker.dir().join("config.json")).unwrap()).unwrap();
        assert_eq!(config["iterations"], 300);

        let lines: Vec<Value> = fs::read_to_string(tracker.dir().join("metrics.jsonl"))
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["_step"], 1);
        assert_eq!(lines[0]["episode_reward_mean"], 1.5);
        assert!(lines[0]["episode_len_mean"].is_null());
        assert_eq!(lines[0]["gif"]["path"], "media/gif_1.gif");
        assert!(tracker.dir().join("media/gif_1.gif").is_file());

        let summary: Value =
            serde_json::from_slice(&fs::read(tracker.dir().join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["episode_reward_mean"], 2.5);
        assert!(matches!(
            tracker.log(3, &Metrics::new(), &[]),
            Err(TrackingError::Finished)
        ));
    }

    #[test]
    fn missing_artifact_is_reported() {
        let root = tempdir().unwrap();
        let mut tracker = LocalTracker::init(root.path(), "p", None).unwrap();
        let artifact = Artifact {
            name: "gif".into(),
            path: root.path().join("nope.gif"),
            kind: ArtifactKind::Video,
        };
        assert!(matches!(
            tracker.log(1, &Metrics::new(), &[artifact]),
            Err(TrackingError::MissingArtifact(_))
        ));
    }
}
