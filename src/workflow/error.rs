use crate::workflow::job::JobStatus;
use crate::workflow::task::{TaskClass, TaskStatus};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("task `{task_id}` not found")]
    UnknownTask { task_id: String },
    #[error("task `{task_id}` already exists")]
    DuplicateTask { task_id: String },
    #[error("task `{task_id}` is `{status}`; operation requires `blocked_human_gate`")]
    NotGated { task_id: String, status: TaskStatus },
    #[error("task `{task_id}` is terminal (`{status}`) and cannot be aborted")]
    AlreadyTerminal { task_id: String, status: TaskStatus },
    #[error("task declaration invalid: {0}")]
    TaskValidation(String),
    #[error("decomposition for `{task_class}` produced {count} jobs; at least 3 required")]
    DecompositionTooSmall { task_class: TaskClass, count: usize },
    #[error("decomposition for `{task_class}` contains a dependency cycle")]
    CyclicDependencies { task_class: TaskClass },
    #[error("job `{job_id}` depends on `{dependency}` which is not in the decomposition")]
    UnknownDependency { job_id: String, dependency: String },
    #[error("job `{job_id}` not found in task `{task_id}`")]
    UnknownJob { task_id: String, job_id: String },
    #[error("job `{job_id}` transition `{from}` -> `{to}` is invalid")]
    InvalidJobTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
