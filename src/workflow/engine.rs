use crate::config::Settings;
use crate::shared::logging::{append_engine_log_line, engine_log_path};
use crate::workflow::error::WorkflowError;
use crate::workflow::executor::{JobAssignment, JobCompletion, JobExecutor, JobOutcome};
use crate::workflow::gate::gate_requires_approval;
use crate::workflow::graph::build_job_graph;
use crate::workflow::job::{Job, JobStatus};
use crate::workflow::store::{TaskRecord, WorkflowStateStore};
use crate::workflow::task::{Task, TaskStatus};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot returned by engine operations: the task id, its computed status,
/// and the job graph with live statuses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskView {
    pub task_id: String,
    pub status: TaskStatus,
    pub jobs: Vec<Job>,
}

/// Orchestrates task records: accepts declarations, promotes and dispatches
/// jobs, applies gate policy, and folds completions back into stored state.
///
/// All mutation of one task happens under that task's lock, so concurrent
/// operations on the same task serialize and the stored record never
/// interleaves partial updates.
pub struct WorkflowEngine {
    store: WorkflowStateStore,
    settings: Settings,
    executor: Arc<dyn JobExecutor>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

fn acquire<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl WorkflowEngine {
    pub fn new(
        store: WorkflowStateStore,
        settings: Settings,
        executor: Arc<dyn JobExecutor>,
    ) -> Self {
        Self {
            store,
            settings,
            executor,
            locks: Mutex::new(HashMap::new()),
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &WorkflowStateStore {
        &self.store
    }

    fn task_lock(&self, task_id: &str) -> Arc<Mutex<()>> {
        let mut locks = acquire(&self.locks);
        Arc::clone(
            locks
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn cancel_flag(&self, task_id: &str) -> Arc<AtomicBool> {
        let mut flags = acquire(&self.cancel_flags);
        Arc::clone(
            flags
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        )
    }

    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn log(&self, task_id: &str, job_id: Option<&str>, message: &str) -> Result<(), WorkflowError> {
        let ts = self.now();
        let line = match job_id {
            Some(job_id) => format!("ts={ts} task_id={task_id} job_id={job_id} {message}"),
            None => format!("ts={ts} task_id={task_id} {message}"),
        };
        append_engine_log_line(self.store.state_root(), &line).map_err(|source| {
            WorkflowError::Io {
                path: engine_log_path(self.store.state_root()).display().to_string(),
                source,
            }
        })
    }

    fn view(&self, record: &TaskRecord) -> TaskView {
        TaskView {
            task_id: record.task.task_id.clone(),
            status: self.computed_status(record),
            jobs: record.jobs.clone(),
        }
    }

    fn job_is_gated(&self, record: &TaskRecord, job: &Job) -> bool {
        gate_requires_approval(&self.settings.gate_rules, &record.task.constraints, job.kind)
            && !record.approved_jobs.contains(&job.job_id)
    }

    /// Pending jobs whose dependencies have all succeeded.
    fn frontier_indices(&self, record: &TaskRecord) -> Vec<usize> {
        let succeeded: BTreeSet<&str> = record
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Succeeded)
            .map(|job| job.job_id.as_str())
            .collect();
        record
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| {
                job.status == JobStatus::Pending
                    && job.depends_on.iter().all(|dep| succeeded.contains(dep.as_str()))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Task status is derived from the record, never stored: the abort flag
    /// dominates, then job failures, then completion, then live work, then
    /// the gate state of the runnable frontier.
    pub fn computed_status(&self, record: &TaskRecord) -> TaskStatus {
        if record.aborted {
            return TaskStatus::Aborted;
        }
        if record.jobs.is_empty() {
            return TaskStatus::Queued;
        }
        if record.jobs.iter().any(|job| job.status == JobStatus::Failed) {
            return TaskStatus::Failed;
        }
        if record.jobs.iter().all(|job| job.status == JobStatus::Succeeded) {
            return TaskStatus::Completed;
        }
        if record
            .jobs
            .iter()
            .any(|job| matches!(job.status, JobStatus::Running | JobStatus::Eligible))
        {
            return TaskStatus::Running;
        }
        let frontier = self.frontier_indices(record);
        if !frontier.is_empty()
            && frontier
                .iter()
                .all(|idx| self.job_is_gated(record, &record.jobs[*idx]))
        {
            return TaskStatus::BlockedHumanGate;
        }
        if record.jobs.iter().any(|job| job.status == JobStatus::Succeeded) {
            return TaskStatus::Running;
        }
        TaskStatus::Planned
    }

    /// Accepts a task declaration: validates it, builds the job graph, and
    /// persists the record. No job starts here; the scheduler (or an
    /// explicit advance) promotes work later, so the status reported
    /// immediately after acceptance is never `running`.
    pub fn run(&self, task: Task) -> Result<TaskView, WorkflowError> {
        task.validate().map_err(WorkflowError::TaskValidation)?;
        let lock = self.task_lock(&task.task_id);
        let _guard = acquire(&lock);
        if self.store.task_exists(&task.task_id) {
            return Err(WorkflowError::DuplicateTask {
                task_id: task.task_id,
            });
        }
        let jobs = build_job_graph(&task)?;
        let record = TaskRecord::new(task, jobs, self.now());
        self.store.save_task(&record)?;
        self.log(
            &record.task.task_id,
            None,
            &format!(
                "event=accepted task_class={} jobs={}",
                record.task.task_class,
                record.jobs.len()
            ),
        )?;
        Ok(self.view(&record))
    }

    pub fn status(&self, task_id: &str) -> Result<TaskView, WorkflowError> {
        let lock = self.task_lock(task_id);
        let _guard = acquire(&lock);
        let record = self.store.load_task(task_id)?;
        Ok(self.view(&record))
    }

    /// Promotes and dispatches runnable jobs for one task. Safe to call at
    /// any time; does nothing for aborted or terminal tasks.
    pub fn advance(&self, task_id: &str) -> Result<TaskView, WorkflowError> {
        let lock = self.task_lock(task_id);
        let _guard = acquire(&lock);
        let mut record = self.store.load_task(task_id)?;
        if !record.aborted && !self.computed_status(&record).is_terminal() {
            let changed = self.advance_locked(&mut record)?;
            if changed {
                record.updated_at = self.now();
                self.store.save_task(&record)?;
            }
        }
        Ok(self.view(&record))
    }

    /// One scheduling pass over every stored task.
    pub fn advance_all(&self) -> Result<(), WorkflowError> {
        for task_id in self.store.list_task_ids()? {
            self.advance(&task_id)?;
        }
        Ok(())
    }

    /// Records human approval for the gated frontier and resumes scheduling.
    /// Only valid while the task is blocked on a gate; approval covers the
    /// jobs blocked right now, so a later gated job blocks the task again.
    pub fn resume(&self, task_id: &str) -> Result<TaskView, WorkflowError> {
        let lock = self.task_lock(task_id);
        let _guard = acquire(&lock);
        let mut record = self.store.load_task(task_id)?;
        let status = self.computed_status(&record);
        if status != TaskStatus::BlockedHumanGate {
            return Err(WorkflowError::NotGated {
                task_id: task_id.to_string(),
                status,
            });
        }
        for idx in self.frontier_indices(&record) {
            let job_id = record.jobs[idx].job_id.clone();
            if self.job_is_gated(&record, &record.jobs[idx]) {
                record.approved_jobs.insert(job_id.clone());
                self.log(task_id, Some(&job_id), "event=gate_approved")?;
            }
        }
        self.advance_locked(&mut record)?;
        record.updated_at = self.now();
        self.store.save_task(&record)?;
        Ok(self.view(&record))
    }

    /// Cooperatively cancels a task: sets the abort flag, signals running
    /// executors through the shared cancel flag, and cancels every
    /// non-terminal job. Aborting an already-aborted task is a no-op;
    /// aborting a completed or failed task is an error.
    pub fn abort(&self, task_id: &str) -> Result<TaskView, WorkflowError> {
        let lock = self.task_lock(task_id);
        let _guard = acquire(&lock);
        let mut record = self.store.load_task(task_id)?;
        let status = self.computed_status(&record);
        if status == TaskStatus::Aborted {
            return Ok(self.view(&record));
        }
        if matches!(status, TaskStatus::Completed | TaskStatus::Failed) {
            return Err(WorkflowError::AlreadyTerminal {
                task_id: task_id.to_string(),
                status,
            });
        }
        record.aborted = true;
        self.cancel_flag(task_id).store(true, Ordering::SeqCst);
        for job in &mut record.jobs {
            if !job.status.is_terminal() {
                job.status = JobStatus::Cancelled;
            }
        }
        record.updated_at = self.now();
        self.store.save_task(&record)?;
        self.log(task_id, None, "event=aborted")?;
        Ok(self.view(&record))
    }

    /// Folds an executor completion back into the record. Completions that
    /// arrive after an abort or a retry re-dispatch target a job that is no
    /// longer `running`; those are logged and dropped.
    pub fn report_job_result(&self, completion: &JobCompletion) -> Result<(), WorkflowError> {
        let lock = self.task_lock(&completion.task_id);
        let _guard = acquire(&lock);
        let mut record = self.store.load_task(&completion.task_id)?;
        let idx = record
            .jobs
            .iter()
            .position(|job| job.job_id == completion.job_id)
            .ok_or_else(|| WorkflowError::UnknownJob {
                task_id: completion.task_id.clone(),
                job_id: completion.job_id.clone(),
            })?;
        if record.aborted || record.jobs[idx].status != JobStatus::Running {
            self.log(
                &completion.task_id,
                Some(&completion.job_id),
                "event=stale_completion_ignored",
            )?;
            return Ok(());
        }
        match &completion.outcome {
            JobOutcome::Succeeded => {
                self.transition_job(&mut record, idx, JobStatus::Succeeded)?;
                self.log(&completion.task_id, Some(&completion.job_id), "event=succeeded")?;
                self.advance_locked(&mut record)?;
            }
            JobOutcome::Cancelled => {
                self.transition_job(&mut record, idx, JobStatus::Cancelled)?;
                self.log(&completion.task_id, Some(&completion.job_id), "event=cancelled")?;
            }
            JobOutcome::Failed { reason } => {
                let limits = self.settings.budget_limits(record.task.budget_class);
                self.transition_job(&mut record, idx, JobStatus::Failed)?;
                record.jobs[idx].last_error = Some(reason.clone());
                if record.jobs[idx].attempts <= limits.max_retries {
                    self.transition_job(&mut record, idx, JobStatus::Eligible)?;
                    self.log(
                        &completion.task_id,
                        Some(&completion.job_id),
                        &format!(
                            "event=retry_scheduled attempts={} max_retries={}",
                            record.jobs[idx].attempts, limits.max_retries
                        ),
                    )?;
                    self.advance_locked(&mut record)?;
                } else {
                    self.log(
                        &completion.task_id,
                        Some(&completion.job_id),
                        "event=retries_exhausted",
                    )?;
                }
            }
        }
        record.updated_at = self.now();
        self.store.save_task(&record)
    }

    fn transition_job(
        &self,
        record: &mut TaskRecord,
        idx: usize,
        next: JobStatus,
    ) -> Result<(), WorkflowError> {
        let job = &mut record.jobs[idx];
        if !job.status.can_transition_to(next) {
            return Err(WorkflowError::InvalidJobTransition {
                job_id: job.job_id.clone(),
                from: job.status,
                to: next,
            });
        }
        job.status = next;
        Ok(())
    }

    /// Promotion and dispatch for a record already held under its lock.
    /// Pending jobs with a satisfied, ungated frontier become eligible;
    /// eligible jobs start up to the budget class's parallel limit.
    fn advance_locked(&self, record: &mut TaskRecord) -> Result<bool, WorkflowError> {
        let mut changed = false;
        for idx in self.frontier_indices(record) {
            if self.job_is_gated(record, &record.jobs[idx]) {
                continue;
            }
            self.transition_job(record, idx, JobStatus::Eligible)?;
            changed = true;
            let job_id = record.jobs[idx].job_id.clone();
            self.log(&record.task.task_id, Some(&job_id), "event=eligible")?;
        }

        let limits = self.settings.budget_limits(record.task.budget_class);
        let mut running = record
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Running)
            .count() as u32;
        for idx in 0..record.jobs.len() {
            if record.jobs[idx].status != JobStatus::Eligible {
                continue;
            }
            if running >= limits.max_parallel_jobs {
                break;
            }
            self.transition_job(record, idx, JobStatus::Running)?;
            record.jobs[idx].attempts += 1;
            running += 1;
            changed = true;
            let job = &record.jobs[idx];
            self.log(
                &record.task.task_id,
                Some(&job.job_id),
                &format!("event=dispatched attempt={}", job.attempts),
            )?;
            self.executor.submit(JobAssignment {
                task_id: record.task.task_id.clone(),
                job_id: job.job_id.clone(),
                kind: job.kind,
                intent: record.task.intent.clone(),
                cancel: self.cancel_flag(&record.task.task_id),
            });
        }
        Ok(changed)
    }
}
