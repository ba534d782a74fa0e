use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Action class of one scheduled step within a task's decomposition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Plan,
    Gather,
    Analyze,
    Implement,
    Validate,
    Report,
    Propose,
    Package,
    Publish,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobKind::Plan => "plan",
            JobKind::Gather => "gather",
            JobKind::Analyze => "analyze",
            JobKind::Implement => "implement",
            JobKind::Validate => "validate",
            JobKind::Report => "report",
            JobKind::Propose => "propose",
            JobKind::Package => "package",
            JobKind::Publish => "publish",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Eligible,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Eligible)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::Eligible, JobStatus::Running)
                | (JobStatus::Eligible, JobStatus::Cancelled)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Cancelled)
                | (JobStatus::Failed, JobStatus::Eligible)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Eligible => "eligible",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Job {
    pub job_id: String,
    pub task_id: String,
    pub kind: JobKind,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    pub status: JobStatus,
    /// Attempts consumed so far; retries re-enter `eligible` until the
    /// budget class's retry limit is exhausted.
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl Job {
    pub fn new(job_id: impl Into<String>, task_id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            job_id: job_id.into(),
            task_id: task_id.into(),
            kind,
            depends_on: BTreeSet::new(),
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn with_deps<const N: usize>(mut self, deps: [&str; N]) -> Self {
        self.depends_on = deps.iter().map(|dep| dep.to_string()).collect();
        self
    }
}
