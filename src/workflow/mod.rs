pub mod engine;
pub mod error;
pub mod executor;
pub mod gate;
pub mod graph;
pub mod job;
pub mod store;
pub mod task;

pub use engine::{TaskView, WorkflowEngine};
pub use error::WorkflowError;
pub use executor::{
    JobAssignment, JobCompletion, JobExecutor, JobOutcome, JobRunner, NoopJobRunner,
    ThreadJobExecutor,
};
pub use gate::gate_requires_approval;
pub use graph::build_job_graph;
pub use job::{Job, JobKind, JobStatus};
pub use store::{TaskRecord, WorkflowStateStore};
pub use task::{BudgetClass, Task, TaskClass, TaskStatus};
