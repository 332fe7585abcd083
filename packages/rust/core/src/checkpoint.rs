//! Per-step index snapshots on disk.
//!
//! Layout of a checkpoint directory:
//! ```text
//! <dir>/
//! ├── manifest.json
//! ├── 0-skeleton.json
//! ├── 1-info.json
//! └── ...
//! ```
//! Each snapshot is a rendered index. The manifest records its digest so
//! that a resumed run never starts from a half-written or edited file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use specindex_shared::{Result, SpecEntry, SpecIndexError};

use crate::index_file::{digest, load_index, render_index, write_atomic};
use crate::steps::BuildStep;

const MANIFEST_FILE: &str = "manifest.json";

/// One saved step snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub position: usize,
    pub name: String,
    pub file: String,
    pub sha256: String,
    pub items: usize,
    pub written_at: DateTime<Utc>,
}

/// Index of the snapshots in a checkpoint directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointManifest {
    /// Run that wrote the latest snapshot.
    pub run_id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub steps: Vec<CheckpointRecord>,
}

pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Open (and create if needed) a checkpoint directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| SpecIndexError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, step: &BuildStep) -> PathBuf {
        self.dir.join(file_name(step))
    }

    /// Persist the output of `step` and record it in the manifest.
    #[instrument(skip_all, fields(step = step.name, items = index.len()))]
    pub fn save(&self, run_id: Uuid, step: &BuildStep, index: &[SpecEntry]) -> Result<CheckpointRecord> {
        let content = render_index(index)?;
        write_atomic(&self.path_for(step), &content)?;

        let now = Utc::now();
        let record = CheckpointRecord {
            position: step.position,
            name: step.name.to_string(),
            file: file_name(step),
            sha256: digest(&content),
            items: index.len(),
            written_at: now,
        };

        let mut manifest = self.manifest()?.unwrap_or(CheckpointManifest {
            run_id,
            updated_at: now,
            steps: Vec::new(),
        });
        manifest.run_id = run_id;
        manifest.updated_at = now;
        manifest.steps.retain(|r| r.position != step.position);
        manifest.steps.push(record.clone());
        manifest.steps.sort_by_key(|r| r.position);
        self.write_manifest(&manifest)?;

        debug!(file = %record.file, sha256 = %record.sha256, "checkpoint saved");
        Ok(record)
    }

    /// Load the snapshot written by `step`, checking it against the manifest.
    #[instrument(skip_all, fields(step = step.name))]
    pub fn load(&self, step: &BuildStep) -> Result<Vec<SpecEntry>> {
        let manifest = self.manifest()?.ok_or_else(|| {
            SpecIndexError::validation(format!(
                "no checkpoint manifest in {}",
                self.dir.display()
            ))
        })?;
        let record = manifest
            .steps
            .iter()
            .find(|r| r.position == step.position && r.name == step.name)
            .ok_or_else(|| {
                SpecIndexError::validation(format!("no checkpoint for step {}", step.name))
            })?;

        let path = self.dir.join(&record.file);
        let content = std::fs::read_to_string(&path).map_err(|e| SpecIndexError::io(&path, e))?;
        if digest(&content) != record.sha256 {
            return Err(SpecIndexError::validation(format!(
                "checkpoint {} was modified after it was written",
                path.display()
            )));
        }

        let index = load_index(&path)?;
        info!(items = index.len(), run_id = %manifest.run_id, "checkpoint loaded");
        Ok(index)
    }

    /// The manifest, if any snapshot was saved yet.
    pub fn manifest(&self) -> Result<Option<CheckpointManifest>> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| SpecIndexError::io(&path, e))?;
        let manifest = serde_json::from_str(&content)
            .map_err(|e| SpecIndexError::validation(format!("invalid {MANIFEST_FILE}: {e}")))?;
        Ok(Some(manifest))
    }

    fn write_manifest(&self, manifest: &CheckpointManifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| SpecIndexError::validation(format!("JSON serialization failed: {e}")))?;
        write_atomic(&self.dir.join(MANIFEST_FILE), &json)
    }
}

fn file_name(step: &BuildStep) -> String {
    format!("{}-{}.json", step.position, step.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::testing::entry;
    use crate::steps::StepKind;

    fn temp_store() -> CheckpointStore {
        let dir = std::env::temp_dir().join(format!("specindex-checkpoint-test-{}", Uuid::now_v7()));
        CheckpointStore::open(dir).unwrap()
    }

    #[test]
    fn save_then_load() {
        let store = temp_store();
        let run_id = Uuid::now_v7();
        let index = vec![entry("https://www.w3.org/TR/foo/", "foo")];

        let record = store.save(run_id, StepKind::Info.step(), &index).unwrap();
        assert_eq!(record.file, "1-info.json");
        assert_eq!(record.items, 1);
        assert_eq!(store.load(StepKind::Info.step()).unwrap(), index);

        let manifest = store.manifest().unwrap().unwrap();
        assert_eq!(manifest.run_id, run_id);
        assert_eq!(manifest.steps.len(), 1);

        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn resaving_a_step_replaces_its_record() {
        let store = temp_store();
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();

        store.save(first, StepKind::Groups.step(), &[]).unwrap();
        store.save(first, StepKind::Skeleton.step(), &[]).unwrap();
        store
            .save(second, StepKind::Groups.step(), &[entry("https://a.example/", "a")])
            .unwrap();

        let manifest = store.manifest().unwrap().unwrap();
        assert_eq!(manifest.run_id, second);
        let names: Vec<_> = manifest.steps.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["skeleton", "groups"]);
        assert_eq!(manifest.steps[1].items, 1);

        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn tampered_snapshot_is_rejected() {
        let store = temp_store();
        store
            .save(Uuid::now_v7(), StepKind::Skeleton.step(), &[entry("https://a.example/", "a")])
            .unwrap();
        std::fs::write(store.path_for(StepKind::Skeleton.step()), "[]\n").unwrap();

        let err = store.load(StepKind::Skeleton.step()).unwrap_err();
        assert!(err.to_string().contains("modified"));

        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn missing_step_is_reported() {
        let store = temp_store();
        assert!(store.load(StepKind::Info.step()).is_err());
        store.save(Uuid::now_v7(), StepKind::Skeleton.step(), &[]).unwrap();
        let err = store.load(StepKind::Info.step()).unwrap_err();
        assert!(err.to_string().contains("no checkpoint for step info"));

        std::fs::remove_dir_all(store.dir()).ok();
    }
}
