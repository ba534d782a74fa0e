use mechanic::commands::ErrorKind;
use mechanic::config::Settings;
use mechanic::handlers::{ToolInvocation, ToolRunError, ToolRunner};
use mechanic::{MechanicServer, ServerParts};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

fn obj(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object input")
}

#[derive(Debug, Clone, PartialEq)]
struct RecordedCall {
    tool: String,
    args: Vec<String>,
    cwd: PathBuf,
}

/// Captures every invocation and replays a scripted result.
struct FakeToolRunner {
    calls: Mutex<Vec<RecordedCall>>,
    exit_code: i32,
    missing: bool,
}

impl FakeToolRunner {
    fn clean() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code: 0,
            missing: false,
        }
    }

    fn missing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code: 0,
            missing: true,
        }
    }

    fn failing(exit_code: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code,
            missing: false,
        }
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl ToolRunner for FakeToolRunner {
    fn run(&self, tool: &str, args: &[String], cwd: &Path) -> Result<ToolInvocation, ToolRunError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            tool: tool.to_string(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
        });
        if self.missing {
            return Err(ToolRunError::Missing {
                tool: tool.to_string(),
            });
        }
        Ok(ToolInvocation {
            exit_code: self.exit_code,
            stdout: "fake output 1.2.3\n".to_string(),
            stderr: String::new(),
        })
    }
}

fn server_with(
    runner: Arc<FakeToolRunner>,
) -> (tempfile::TempDir, tempfile::TempDir, MechanicServer) {
    let state = tempfile::tempdir().expect("state dir");
    let projects = tempfile::tempdir().expect("projects dir");
    let settings = Settings {
        projects_root: projects.path().to_path_buf(),
        ..Settings::default()
    };
    let parts = ServerParts {
        tool_runner: runner,
        ..ServerParts::default()
    };
    let server = MechanicServer::with_parts(state.path(), settings, parts).expect("server");
    (state, projects, server)
}

#[test]
fn lint_runs_the_configured_linter_inside_the_addon_dir() {
    let runner = Arc::new(FakeToolRunner::clean());
    let (_state, projects, server) = server_with(Arc::clone(&runner));
    let addon_dir = projects.path().join("PixelCooldown");
    std::fs::create_dir_all(&addon_dir).expect("addon dir");

    let result = server.dispatch("addon.lint", &obj(json!({"addon": "PixelCooldown"})));
    assert!(result.success, "lint failed: {:?}", result.error);
    assert_eq!(result.data.expect("data")["clean"], true);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tool, "luacheck");
    assert_eq!(calls[0].args, vec!["."]);
    assert_eq!(calls[0].cwd, addon_dir);
}

#[test]
fn lint_forwards_the_addon_config_only_when_present() {
    let runner = Arc::new(FakeToolRunner::clean());
    let (_state, projects, server) = server_with(Arc::clone(&runner));
    let addon_dir = projects.path().join("PixelCooldown");
    std::fs::create_dir_all(&addon_dir).expect("addon dir");
    std::fs::write(addon_dir.join(".luacheckrc"), "std = \"lua51\"\n").expect("rc");

    server.dispatch("addon.lint", &obj(json!({"addon": "PixelCooldown"})));
    let calls = runner.calls();
    assert_eq!(calls[0].args, vec![".", "--config", ".luacheckrc"]);
}

#[test]
fn lint_of_a_missing_addon_is_not_found() {
    let runner = Arc::new(FakeToolRunner::clean());
    let (_state, _projects, server) = server_with(Arc::clone(&runner));
    let result = server.dispatch("addon.lint", &obj(json!({"addon": "Ghost"})));
    assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
    assert!(runner.calls().is_empty());
}

#[test]
fn missing_linter_binary_is_tool_missing() {
    let runner = Arc::new(FakeToolRunner::missing());
    let (_state, projects, server) = server_with(Arc::clone(&runner));
    std::fs::create_dir_all(projects.path().join("PixelCooldown")).expect("addon dir");
    let result = server.dispatch("addon.lint", &obj(json!({"addon": "PixelCooldown"})));
    assert_eq!(result.error_kind(), Some(ErrorKind::ToolMissing));
}

#[test]
fn lint_findings_still_succeed_with_a_dirty_verdict() {
    let runner = Arc::new(FakeToolRunner::failing(1));
    let (_state, projects, server) = server_with(Arc::clone(&runner));
    std::fs::create_dir_all(projects.path().join("PixelCooldown")).expect("addon dir");
    let result = server.dispatch("addon.lint", &obj(json!({"addon": "PixelCooldown"})));
    assert!(result.success);
    assert_eq!(result.data.expect("data")["clean"], false);
}

#[test]
fn format_check_mode_passes_the_check_flag() {
    let runner = Arc::new(FakeToolRunner::clean());
    let (_state, projects, server) = server_with(Arc::clone(&runner));
    std::fs::create_dir_all(projects.path().join("PixelCooldown")).expect("addon dir");

    server.dispatch(
        "addon.format",
        &obj(json!({"addon": "PixelCooldown", "check": true})),
    );
    server.dispatch("addon.format", &obj(json!({"addon": "PixelCooldown"})));

    let calls = runner.calls();
    assert_eq!(calls[0].tool, "stylua");
    assert_eq!(calls[0].args, vec!["--check", "."]);
    assert_eq!(calls[1].args, vec!["."]);
}

#[test]
fn tools_status_probes_both_configured_binaries() {
    let runner = Arc::new(FakeToolRunner::clean());
    let (_state, _projects, server) = server_with(Arc::clone(&runner));
    let result = server.dispatch("tools.status", &Map::new());
    assert!(result.success, "tools.status failed: {:?}", result.error);
    let data = result.data.expect("data");
    assert_eq!(data["linter"]["available"], true);
    assert_eq!(data["linter"]["version"], "fake output 1.2.3");
    assert_eq!(data["formatter"]["available"], true);
    let probed: Vec<String> = runner.calls().iter().map(|call| call.tool.clone()).collect();
    assert_eq!(probed, vec!["luacheck", "stylua"]);
}

#[test]
fn env_status_reports_paths_without_touching_tools() {
    let runner = Arc::new(FakeToolRunner::clean());
    let (_state, projects, server) = server_with(Arc::clone(&runner));
    let result = server.dispatch("env.status", &Map::new());
    assert!(result.success, "env.status failed: {:?}", result.error);
    let data = result.data.expect("data");
    assert_eq!(
        data["projects_root"],
        projects.path().display().to_string()
    );
    assert_eq!(data["projects_root_exists"], true);
    assert!(runner.calls().is_empty());
}
