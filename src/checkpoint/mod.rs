//! Checkpoint persistence
//!
//! One record per `(run_id, stage)` holding `{stage, data}`. Every completed
//! step is checkpointed so runs can be inspected or replayed later.
//!
//! Layout of the file store:
//!
//! ```text
//! <base>/<run_id>/INIT.json
//! <base>/<run_id>/PLAN.json
//! ...
//! ```

use crate::agent::state::{Blackboard, RunState, Stage};
use crate::errors::{KernelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default directory for file checkpoints
pub const DEFAULT_CHECKPOINT_DIR: &str = ".checkpoints";

/// Persisted snapshot of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub stage: Stage,
    pub data: Blackboard,
}

impl CheckpointRecord {
    /// Rebuild a run positioned at this checkpoint's stage
    pub fn into_run_state(self, run_id: impl Into<String>) -> RunState {
        RunState::at_stage(run_id, self.stage, self.data)
    }
}

/// Durable snapshot store keyed by run id and stage
pub trait CheckpointStore: Send + Sync {
    /// Persist a snapshot, returning where it was written
    fn save(&self, run_id: &str, stage: Stage, data: &Blackboard) -> Result<String>;

    /// Load the snapshot of `stage`, or of the latest completed stage when
    /// `stage` is `None`
    fn load(&self, run_id: &str, stage: Option<Stage>) -> Result<Option<CheckpointRecord>>;

    /// All run ids with at least one checkpoint, sorted
    fn list_runs(&self) -> Result<Vec<String>>;
}

/// Checkpoints written as pretty JSON files, one directory per run
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    base_path: PathBuf,
}

impl FileCheckpointStore {
    /// Create store, creating the base directory if needed
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Get base directory
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn run_dir(&self, run_id: &str) -> Result<PathBuf> {
        validate_run_id(run_id)?;
        Ok(self.base_path.join(run_id))
    }

    fn stage_file(run_dir: &Path, stage: Stage) -> PathBuf {
        run_dir.join(format!("{}.json", stage))
    }

    fn read_record(path: &Path) -> Result<Option<CheckpointRecord>> {
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, run_id: &str, stage: Stage, data: &Blackboard) -> Result<String> {
        let run_dir = self.run_dir(run_id)?;
        fs::create_dir_all(&run_dir)?;

        let path = Self::stage_file(&run_dir, stage);
        let record = CheckpointRecord {
            stage,
            data: data.clone(),
        };
        fs::write(&path, serde_json::to_string_pretty(&record)?)?;

        tracing::debug!(run_id, %stage, path = %path.display(), "checkpoint saved");
        Ok(path.display().to_string())
    }

    fn load(&self, run_id: &str, stage: Option<Stage>) -> Result<Option<CheckpointRecord>> {
        let run_dir = self.run_dir(run_id)?;
        if !run_dir.is_dir() {
            return Ok(None);
        }

        match stage {
            Some(stage) => Self::read_record(&Self::stage_file(&run_dir, stage)),
            None => {
                for stage in Stage::ALL.iter().rev() {
                    if let Some(record) = Self::read_record(&Self::stage_file(&run_dir, *stage))? {
                        return Ok(Some(record));
                    }
                }
                Ok(None)
            }
        }
    }

    fn list_runs(&self) -> Result<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    runs.push(name.to_string());
                }
            }
        }
        runs.sort();
        Ok(runs)
    }
}

/// In-memory checkpoint store
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    runs: Mutex<BTreeMap<String, HashMap<Stage, CheckpointRecord>>>,
    history: Mutex<Vec<(String, Stage)>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages saved for a run, in save order
    pub fn saved_stages(&self, run_id: &str) -> Vec<Stage> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|(id, _)| id == run_id)
            .map(|(_, stage)| *stage)
            .collect()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, run_id: &str, stage: Stage, data: &Blackboard) -> Result<String> {
        let record = CheckpointRecord {
            stage,
            data: data.clone(),
        };
        self.runs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(run_id.to_string())
            .or_default()
            .insert(stage, record);
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((run_id.to_string(), stage));
        Ok(format!("memory://{}/{}", run_id, stage))
    }

    fn load(&self, run_id: &str, stage: Option<Stage>) -> Result<Option<CheckpointRecord>> {
        let runs = self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(records) = runs.get(run_id) else {
            return Ok(None);
        };

        let record = match stage {
            Some(stage) => records.get(&stage),
            None => Stage::ALL.iter().rev().find_map(|stage| records.get(stage)),
        };
        Ok(record.cloned())
    }

    fn list_runs(&self) -> Result<Vec<String>> {
        Ok(self
            .runs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect())
    }
}

/// Run ids become directory and file names; keep them to a single segment
pub(crate) fn validate_run_id(run_id: &str) -> Result<()> {
    let valid = !run_id.is_empty()
        && run_id != "."
        && run_id != ".."
        && !run_id.contains(['/', '\\'])
        && !run_id.contains('\0');
    if valid {
        Ok(())
    } else {
        Err(KernelError::Checkpoint(format!("invalid run id '{}'", run_id)))
    }
}
