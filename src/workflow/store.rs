use crate::shared::fs_atomic::atomic_write_file;
use crate::workflow::error::WorkflowError;
use crate::workflow::job::Job;
use crate::workflow::task::Task;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything persisted for one task: the immutable declaration, the job
/// graph with live statuses, the abort flag, and gate approvals granted so
/// far. One JSON file per task under `workflows/tasks/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskRecord {
    pub task: Task,
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub aborted: bool,
    #[serde(default)]
    pub approved_jobs: BTreeSet<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TaskRecord {
    pub fn new(task: Task, jobs: Vec<Job>, now: i64) -> Self {
        Self {
            task,
            jobs,
            aborted: false,
            approved_jobs: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowStateStore {
    state_root: PathBuf,
}

impl WorkflowStateStore {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
        }
    }

    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    fn tasks_dir(&self) -> PathBuf {
        self.state_root.join("workflows").join("tasks")
    }

    fn task_path(&self, task_id: &str) -> PathBuf {
        self.tasks_dir().join(format!("{task_id}.json"))
    }

    pub fn task_exists(&self, task_id: &str) -> bool {
        self.task_path(task_id).is_file()
    }

    pub fn save_task(&self, record: &TaskRecord) -> Result<(), WorkflowError> {
        let path = self.task_path(&record.task.task_id);
        let json =
            serde_json::to_string_pretty(record).map_err(|source| WorkflowError::Json {
                path: path.display().to_string(),
                source,
            })?;
        atomic_write_file(&path, json.as_bytes()).map_err(|source| WorkflowError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn load_task(&self, task_id: &str) -> Result<TaskRecord, WorkflowError> {
        let path = self.task_path(task_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Err(WorkflowError::UnknownTask {
                    task_id: task_id.to_string(),
                });
            }
            Err(source) => {
                return Err(WorkflowError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| WorkflowError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Task ids with a record on disk, sorted for deterministic iteration.
    pub fn list_task_ids(&self) -> Result<Vec<String>, WorkflowError> {
        let dir = self.tasks_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(WorkflowError::Io {
                    path: dir.display().to_string(),
                    source,
                });
            }
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| WorkflowError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let name = entry.file_name();
            if let Some(stem) = name.to_string_lossy().strip_suffix(".json") {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
