//! Opt-in background workers. The engine itself never spawns threads; a
//! deployment that wants autonomous progress starts these explicitly.

use crate::shared::logging::append_engine_log_line;
use crate::workflow::executor::JobCompletion;
use crate::workflow::WorkflowEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub struct WorkerHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn log_worker_error(engine: &WorkflowEngine, worker: &str, error: &dyn std::fmt::Display) {
    let line = format!("worker={worker} event=error detail={error}");
    let _ = append_engine_log_line(engine.store().state_root(), &line);
}

/// Drains executor completions into the engine until stopped.
pub fn spawn_completion_worker(
    engine: Arc<WorkflowEngine>,
    completions: mpsc::Receiver<JobCompletion>,
) -> WorkerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    let join = thread::spawn(move || {
        while !stop_flag.load(Ordering::SeqCst) {
            match completions.recv_timeout(Duration::from_millis(200)) {
                Ok(completion) => {
                    if let Err(error) = engine.report_job_result(&completion) {
                        log_worker_error(&engine, "completion", &error);
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
    WorkerHandle {
        stop,
        join: Some(join),
    }
}

/// Periodically promotes and dispatches runnable jobs across all tasks.
pub fn spawn_scheduler_worker(engine: Arc<WorkflowEngine>, poll: Duration) -> WorkerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    let join = thread::spawn(move || {
        while !stop_flag.load(Ordering::SeqCst) {
            if let Err(error) = engine.advance_all() {
                log_worker_error(&engine, "scheduler", &error);
            }
            // responsive shutdown even with long poll intervals
            let deadline = Instant::now() + poll;
            while Instant::now() < deadline && !stop_flag.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(20));
            }
        }
    });
    WorkerHandle {
        stop,
        join: Some(join),
    }
}
