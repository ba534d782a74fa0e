use crate::workflow::error::WorkflowError;
use crate::workflow::job::{Job, JobKind};
use crate::workflow::task::{Task, TaskClass};
use std::collections::{BTreeMap, BTreeSet};

const MIN_JOBS_PER_TASK: usize = 3;

/// Builds the dependency-ordered job graph for a task. Decomposition is
/// deterministic per task class; the same task always yields the same graph.
pub fn build_job_graph(task: &Task) -> Result<Vec<Job>, WorkflowError> {
    let jobs = match task.task_class {
        TaskClass::CodeImplementation => code_implementation_jobs(&task.task_id),
        TaskClass::Investigation => investigation_jobs(&task.task_id),
        TaskClass::Release => release_jobs(&task.task_id),
    };
    verify_graph(task.task_class, &jobs)?;
    Ok(jobs)
}

fn code_implementation_jobs(task_id: &str) -> Vec<Job> {
    vec![
        Job::new("plan", task_id, JobKind::Plan),
        Job::new("implement", task_id, JobKind::Implement).with_deps(["plan"]),
        Job::new("validate", task_id, JobKind::Validate).with_deps(["implement"]),
        Job::new("propose", task_id, JobKind::Propose).with_deps(["validate"]),
    ]
}

fn investigation_jobs(task_id: &str) -> Vec<Job> {
    vec![
        Job::new("gather", task_id, JobKind::Gather),
        Job::new("analyze", task_id, JobKind::Analyze).with_deps(["gather"]),
        Job::new("report", task_id, JobKind::Report).with_deps(["analyze"]),
    ]
}

fn release_jobs(task_id: &str) -> Vec<Job> {
    vec![
        Job::new("validate", task_id, JobKind::Validate),
        Job::new("package", task_id, JobKind::Package).with_deps(["validate"]),
        Job::new("publish", task_id, JobKind::Publish).with_deps(["package"]),
    ]
}

/// Structural guarantees for every decomposition: at least three jobs, all
/// dependency edges point at jobs in the same graph, and no cycles.
fn verify_graph(task_class: TaskClass, jobs: &[Job]) -> Result<(), WorkflowError> {
    if jobs.len() < MIN_JOBS_PER_TASK {
        return Err(WorkflowError::DecompositionTooSmall {
            task_class,
            count: jobs.len(),
        });
    }
    let known: BTreeSet<&str> = jobs.iter().map(|job| job.job_id.as_str()).collect();
    for job in jobs {
        for dep in &job.depends_on {
            if !known.contains(dep.as_str()) {
                return Err(WorkflowError::UnknownDependency {
                    job_id: job.job_id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    // Kahn's algorithm; anything left unvisited sits on a cycle.
    let mut indegree: BTreeMap<&str, usize> = jobs
        .iter()
        .map(|job| (job.job_id.as_str(), job.depends_on.len()))
        .collect();
    let mut ready: Vec<&str> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut visited = 0usize;
    while let Some(done) = ready.pop() {
        visited += 1;
        for job in jobs {
            if job.depends_on.contains(done) {
                let degree = indegree
                    .get_mut(job.job_id.as_str())
                    .ok_or(WorkflowError::CyclicDependencies { task_class })?;
                *degree -= 1;
                if *degree == 0 {
                    ready.push(job.job_id.as_str());
                }
            }
        }
    }
    if visited != jobs.len() {
        return Err(WorkflowError::CyclicDependencies { task_class });
    }
    Ok(())
}
