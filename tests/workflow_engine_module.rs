use mechanic::commands::ErrorKind;
use mechanic::config::Settings;
use mechanic::workflow::{BudgetClass, JobCompletion, JobOutcome, Task, TaskClass};
use mechanic::MechanicServer;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

fn obj(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object input")
}

fn server() -> (tempfile::TempDir, MechanicServer) {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MechanicServer::new(dir.path(), Settings::default()).expect("server");
    (dir, server)
}

fn run_input(task_id: &str, task_class: &str, constraints: Value) -> Map<String, Value> {
    obj(json!({
        "task": {
            "task_id": task_id,
            "intent": "ship the cooldown fix",
            "context_refs": ["projects/WowDev/PixelCooldown"],
            "constraints": constraints,
            "budget_class": "standard",
            "task_class": task_class,
        }
    }))
}

fn status_of(server: &MechanicServer, task_id: &str) -> String {
    let result = server.dispatch("workflow.status", &obj(json!({"task_id": task_id})));
    assert!(result.success, "status failed: {:?}", result.error);
    result.data.expect("data")["status"]
        .as_str()
        .expect("status string")
        .to_string()
}

#[test]
fn run_reports_a_never_running_status_and_builds_the_graph() {
    let (_dir, server) = server();
    let result = server.dispatch("workflow.run", &run_input("t1", "investigation", json!({})));
    assert!(result.success, "run failed: {:?}", result.error);
    let data = result.data.expect("data");
    assert!(matches!(
        data["status"].as_str(),
        Some("queued" | "planned" | "blocked_human_gate")
    ));
    let jobs = data["jobs"].as_array().expect("jobs");
    assert!(jobs.len() >= 3);
    assert!(jobs
        .iter()
        .all(|job| job["status"].as_str() == Some("pending")));
}

#[test]
fn resubmitting_a_task_id_is_a_duplicate_error() {
    let (_dir, server) = server();
    assert!(server
        .dispatch("workflow.run", &run_input("t1", "investigation", json!({})))
        .success);
    let second = server.dispatch("workflow.run", &run_input("t1", "release", json!({})));
    assert_eq!(second.error_kind(), Some(ErrorKind::DuplicateTask));
    // original decomposition survives
    let status = server.dispatch("workflow.status", &obj(json!({"task_id": "t1"})));
    let jobs = status.data.expect("data")["jobs"].as_array().cloned().expect("jobs");
    assert!(jobs.iter().any(|job| job["job_id"] == "gather"));
}

#[test]
fn concurrent_submissions_of_one_task_id_have_exactly_one_winner() {
    let (_dir, server) = server();
    let server = Arc::new(server);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let server = Arc::clone(&server);
        handles.push(thread::spawn(move || {
            server.engine().run(Task {
                task_id: "contended".to_string(),
                intent: "race".to_string(),
                context_refs: Vec::new(),
                constraints: BTreeMap::new(),
                budget_class: BudgetClass::Standard,
                task_class: TaskClass::Investigation,
            })
        }));
    }
    let outcomes: Vec<bool> = handles
        .into_iter()
        .map(|handle| handle.join().expect("join").is_ok())
        .collect();
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
}

#[test]
fn unknown_task_status_is_not_found() {
    let (_dir, server) = server();
    let result = server.dispatch("workflow.status", &obj(json!({"task_id": "ghost"})));
    assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
}

#[test]
fn gate_blocks_resume_unblocks_and_a_later_gate_reblocks() {
    let (_dir, server) = server();
    let constraints = json!({"require_plan_review": true, "no_auto_merge": true});
    server.dispatch(
        "workflow.run",
        &run_input("gated", "code_implementation", constraints),
    );
    assert_eq!(status_of(&server, "gated"), "blocked_human_gate");

    let resumed = server.dispatch("workflow.resume", &obj(json!({"task_id": "gated"})));
    assert!(resumed.success, "resume failed: {:?}", resumed.error);
    assert_eq!(status_of(&server, "gated"), "running");

    // walk the chain by reporting completions directly
    for job_id in ["plan", "implement", "validate"] {
        server
            .engine()
            .report_job_result(&JobCompletion {
                task_id: "gated".to_string(),
                job_id: job_id.to_string(),
                outcome: JobOutcome::Succeeded,
            })
            .expect("report");
    }
    // propose is gated by no_auto_merge; the earlier approval does not carry over
    assert_eq!(status_of(&server, "gated"), "blocked_human_gate");
    assert!(server
        .dispatch("workflow.resume", &obj(json!({"task_id": "gated"})))
        .success);
    server
        .engine()
        .report_job_result(&JobCompletion {
            task_id: "gated".to_string(),
            job_id: "propose".to_string(),
            outcome: JobOutcome::Succeeded,
        })
        .expect("report");
    assert_eq!(status_of(&server, "gated"), "completed");
}

#[test]
fn resume_without_a_gate_is_invalid_state() {
    let (_dir, server) = server();
    server.dispatch("workflow.run", &run_input("plain", "investigation", json!({})));
    let result = server.dispatch("workflow.resume", &obj(json!({"task_id": "plain"})));
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidState));
}

#[test]
fn abort_cancels_cooperatively_and_is_idempotent() {
    let (_dir, server) = server();
    server.dispatch("workflow.run", &run_input("doomed", "investigation", json!({})));
    server.engine().advance("doomed").expect("advance");

    let aborted = server.dispatch("workflow.abort", &obj(json!({"task_id": "doomed"})));
    assert!(aborted.success, "abort failed: {:?}", aborted.error);
    assert_eq!(status_of(&server, "doomed"), "aborted");
    let jobs = aborted.data.expect("data")["jobs"].as_array().cloned().expect("jobs");
    assert!(jobs
        .iter()
        .all(|job| job["status"].as_str() == Some("cancelled")));

    // second abort is a success no-op
    let again = server.dispatch("workflow.abort", &obj(json!({"task_id": "doomed"})));
    assert!(again.success);
    assert_eq!(status_of(&server, "doomed"), "aborted");
}

#[test]
fn aborting_a_completed_task_is_invalid_state() {
    let (_dir, server) = server();
    server.dispatch("workflow.run", &run_input("done", "investigation", json!({})));
    server.engine().advance("done").expect("advance");
    for job_id in ["gather", "analyze", "report"] {
        server
            .engine()
            .report_job_result(&JobCompletion {
                task_id: "done".to_string(),
                job_id: job_id.to_string(),
                outcome: JobOutcome::Succeeded,
            })
            .expect("report");
    }
    assert_eq!(status_of(&server, "done"), "completed");
    let result = server.dispatch("workflow.abort", &obj(json!({"task_id": "done"})));
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidState));
}

#[test]
fn exhausted_retries_fail_the_task_and_keep_the_last_error() {
    let (_dir, server) = server();
    server.dispatch("workflow.run", &run_input("flaky", "investigation", json!({})));
    server.engine().advance("flaky").expect("advance");

    // standard budget allows 2 retries: 3 attempts in total
    for _ in 0..3 {
        server
            .engine()
            .report_job_result(&JobCompletion {
                task_id: "flaky".to_string(),
                job_id: "gather".to_string(),
                outcome: JobOutcome::Failed {
                    reason: "luacheck crashed".to_string(),
                },
            })
            .expect("report");
    }
    assert_eq!(status_of(&server, "flaky"), "failed");
    let status = server.dispatch("workflow.status", &obj(json!({"task_id": "flaky"})));
    let jobs = status.data.expect("data")["jobs"].as_array().cloned().expect("jobs");
    let gather = jobs
        .iter()
        .find(|job| job["job_id"] == "gather")
        .expect("gather");
    assert_eq!(gather["status"], "failed");
    assert_eq!(gather["attempts"], 3);
    assert_eq!(gather["last_error"], "luacheck crashed");
}

#[test]
fn malformed_task_declarations_are_validation_errors() {
    let (_dir, server) = server();
    // unknown task_class
    let result = server.dispatch("workflow.run", &run_input("bad", "archaeology", json!({})));
    assert_eq!(result.error_kind(), Some(ErrorKind::ValidationError));
    // unknown field inside the declaration
    let result = server.dispatch(
        "workflow.run",
        &obj(json!({"task": {
            "task_id": "bad2",
            "intent": "x",
            "budget_class": "standard",
            "task_class": "investigation",
            "priority": 9,
        }})),
    );
    assert_eq!(result.error_kind(), Some(ErrorKind::ValidationError));
}
