use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named tier bounding how much scheduling/retry effort a task may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetClass {
    Standard,
    Extended,
}

impl std::fmt::Display for BudgetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetClass::Standard => write!(f, "standard"),
            BudgetClass::Extended => write!(f, "extended"),
        }
    }
}

/// Selects the decomposition template the job graph builder applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
    CodeImplementation,
    Investigation,
    Release,
}

impl std::fmt::Display for TaskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskClass::CodeImplementation => write!(f, "code_implementation"),
            TaskClass::Investigation => write!(f, "investigation"),
            TaskClass::Release => write!(f, "release"),
        }
    }
}

/// Caller-declared unit of intent. Immutable once accepted; re-submission of
/// an existing task_id is an error, never an overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct Task {
    pub task_id: String,
    pub intent: String,
    #[serde(default)]
    pub context_refs: Vec<String>,
    #[serde(default)]
    pub constraints: BTreeMap<String, bool>,
    pub budget_class: BudgetClass,
    pub task_class: TaskClass,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        crate::shared::ids::validate_identifier_value("task id", &self.task_id)?;
        if self.intent.trim().is_empty() {
            return Err("task intent must be non-empty".to_string());
        }
        for constraint in self.constraints.keys() {
            crate::shared::ids::validate_identifier_value("constraint name", constraint)?;
        }
        Ok(())
    }
}

/// Computed per-task status; a pure function of job statuses plus gate state,
/// never stored redundantly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Planned,
    BlockedHumanGate,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Aborted
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Planned => write!(f, "planned"),
            TaskStatus::BlockedHumanGate => write!(f, "blocked_human_gate"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Aborted => write!(f, "aborted"),
        }
    }
}
