use crate::commands::dispatch::required_str;
use crate::commands::envelope::{ErrorKind, HandlerFailure, HandlerOutput};
use crate::commands::registry::CommandHandler;
use crate::workflow::engine::TaskView;
use crate::workflow::task::Task;
use crate::workflow::{WorkflowEngine, WorkflowError};
use serde_json::{Map, Value};
use std::sync::Arc;

fn map_workflow_error(error: WorkflowError) -> HandlerFailure {
    let message = error.to_string();
    let kind = match error {
        WorkflowError::UnknownTask { .. } => ErrorKind::NotFound,
        WorkflowError::DuplicateTask { .. } => ErrorKind::DuplicateTask,
        WorkflowError::NotGated { .. } | WorkflowError::AlreadyTerminal { .. } => {
            ErrorKind::InvalidState
        }
        WorkflowError::TaskValidation(_)
        | WorkflowError::DecompositionTooSmall { .. }
        | WorkflowError::CyclicDependencies { .. }
        | WorkflowError::UnknownDependency { .. } => ErrorKind::ValidationError,
        WorkflowError::UnknownJob { .. }
        | WorkflowError::InvalidJobTransition { .. }
        | WorkflowError::Io { .. }
        | WorkflowError::Json { .. } => ErrorKind::Internal,
    };
    HandlerFailure::new(kind, message)
}

fn view_data(view: &TaskView) -> Result<Value, HandlerFailure> {
    serde_json::to_value(view)
        .map_err(|err| HandlerFailure::internal(format!("task view serialization failed: {err}")))
}

pub struct WorkflowRunHandler {
    engine: Arc<WorkflowEngine>,
}

impl WorkflowRunHandler {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }
}

impl CommandHandler for WorkflowRunHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let raw = input
            .get("task")
            .cloned()
            .ok_or_else(|| HandlerFailure::validation("missing required field `task`"))?;
        let task: Task = serde_json::from_value(raw)
            .map_err(|err| HandlerFailure::validation(format!("invalid task declaration: {err}")))?;
        let view = self.engine.run(task).map_err(map_workflow_error)?;
        let reasoning = format!(
            "accepted task `{}` with {} jobs; status is `{}`",
            view.task_id,
            view.jobs.len(),
            view.status
        );
        Ok(HandlerOutput::new(view_data(&view)?, reasoning))
    }
}

pub struct WorkflowStatusHandler {
    engine: Arc<WorkflowEngine>,
}

impl WorkflowStatusHandler {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }
}

impl CommandHandler for WorkflowStatusHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let task_id = required_str(input, "task_id").map_err(HandlerFailure::validation)?;
        let view = self.engine.status(task_id).map_err(map_workflow_error)?;
        let reasoning = format!("task `{}` is `{}`", view.task_id, view.status);
        Ok(HandlerOutput::new(view_data(&view)?, reasoning))
    }
}

pub struct WorkflowResumeHandler {
    engine: Arc<WorkflowEngine>,
}

impl WorkflowResumeHandler {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }
}

impl CommandHandler for WorkflowResumeHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let task_id = required_str(input, "task_id").map_err(HandlerFailure::validation)?;
        let view = self.engine.resume(task_id).map_err(map_workflow_error)?;
        let reasoning = format!(
            "approved the gated jobs of task `{}`; status is `{}`",
            view.task_id, view.status
        );
        Ok(HandlerOutput::new(view_data(&view)?, reasoning))
    }
}

pub struct WorkflowAbortHandler {
    engine: Arc<WorkflowEngine>,
}

impl WorkflowAbortHandler {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }
}

impl CommandHandler for WorkflowAbortHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let task_id = required_str(input, "task_id").map_err(HandlerFailure::validation)?;
        let view = self.engine.abort(task_id).map_err(map_workflow_error)?;
        let reasoning = format!("task `{}` is `{}`", view.task_id, view.status);
        Ok(HandlerOutput::new(view_data(&view)?, reasoning))
    }
}
