use crate::workflow::job::JobKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

/// One dispatched unit of work handed to an executor. The cancel flag is
/// shared with the engine; executors must stop promptly once it is set.
#[derive(Debug, Clone)]
pub struct JobAssignment {
    pub task_id: String,
    pub job_id: String,
    pub kind: JobKind,
    pub intent: String,
    pub cancel: Arc<AtomicBool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed { reason: String },
    Cancelled,
}

/// Reported back to the engine once an assignment finishes. Completions are
/// the only channel through which job state leaves `running`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCompletion {
    pub task_id: String,
    pub job_id: String,
    pub outcome: JobOutcome,
}

/// Capability boundary between scheduling and execution. The engine never
/// blocks on job work; it submits and later receives a completion.
pub trait JobExecutor: Send + Sync {
    fn submit(&self, assignment: JobAssignment);
}

/// Performs the actual work of one assignment. Implementations decide what a
/// job kind means; the executor only runs them and reports outcomes.
pub trait JobRunner: Send + Sync {
    fn run(&self, assignment: &JobAssignment) -> Result<(), String>;
}

/// Runner that completes every assignment immediately without side effects.
/// Useful for dry runs and as the default when no worker backend is wired.
pub struct NoopJobRunner;

impl JobRunner for NoopJobRunner {
    fn run(&self, _assignment: &JobAssignment) -> Result<(), String> {
        Ok(())
    }
}

/// Executor that runs each assignment on its own std thread and reports the
/// completion over an mpsc channel.
pub struct ThreadJobExecutor {
    runner: Arc<dyn JobRunner>,
    completions: mpsc::Sender<JobCompletion>,
}

impl ThreadJobExecutor {
    pub fn new(runner: Arc<dyn JobRunner>, completions: mpsc::Sender<JobCompletion>) -> Self {
        Self { runner, completions }
    }
}

impl JobExecutor for ThreadJobExecutor {
    fn submit(&self, assignment: JobAssignment) {
        let runner = Arc::clone(&self.runner);
        let completions = self.completions.clone();
        thread::spawn(move || {
            let outcome = if assignment.cancel.load(Ordering::SeqCst) {
                JobOutcome::Cancelled
            } else {
                match runner.run(&assignment) {
                    Ok(()) => JobOutcome::Succeeded,
                    Err(reason) => JobOutcome::Failed { reason },
                }
            };
            // Receiver may be gone during shutdown; nothing to do then.
            let _ = completions.send(JobCompletion {
                task_id: assignment.task_id,
                job_id: assignment.job_id,
                outcome,
            });
        });
    }
}
