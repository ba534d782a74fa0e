use crate::commands::dispatch::{optional_bool, required_str};
use crate::commands::envelope::{ErrorKind, HandlerFailure, HandlerOutput};
use crate::commands::registry::CommandHandler;
use crate::config::Settings;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// Captured result of one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolRunError {
    #[error("tool `{tool}` is not installed or not on PATH")]
    Missing { tool: String },
    #[error("tool `{tool}` failed to run: {detail}")]
    Io { tool: String, detail: String },
}

/// Seam for invoking external binaries; tests substitute a fake.
pub trait ToolRunner: Send + Sync {
    fn run(&self, tool: &str, args: &[String], cwd: &Path) -> Result<ToolInvocation, ToolRunError>;
}

/// Runs tools as real subprocesses.
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, tool: &str, args: &[String], cwd: &Path) -> Result<ToolInvocation, ToolRunError> {
        let output = Command::new(tool)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    ToolRunError::Missing {
                        tool: tool.to_string(),
                    }
                } else {
                    ToolRunError::Io {
                        tool: tool.to_string(),
                        detail: err.to_string(),
                    }
                }
            })?;
        Ok(ToolInvocation {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn map_tool_error(error: ToolRunError) -> HandlerFailure {
    let message = error.to_string();
    let kind = match error {
        ToolRunError::Missing { .. } => ErrorKind::ToolMissing,
        ToolRunError::Io { .. } => ErrorKind::Internal,
    };
    HandlerFailure::new(kind, message)
}

fn addon_dir(projects_root: &Path, addon: &str) -> Result<PathBuf, HandlerFailure> {
    crate::shared::ids::validate_identifier_value("addon name", addon)
        .map_err(HandlerFailure::validation)?;
    let dir = projects_root.join(addon);
    if !dir.is_dir() {
        return Err(HandlerFailure::not_found(format!(
            "addon `{addon}` not found under {}",
            projects_root.display()
        )));
    }
    Ok(dir)
}

fn invocation_data(invocation: &ToolInvocation) -> Value {
    json!({
        "exit_code": invocation.exit_code,
        "stdout": invocation.stdout,
        "stderr": invocation.stderr,
        "clean": invocation.exit_code == 0,
    })
}

pub struct AddonLintHandler {
    settings: Settings,
    runner: Arc<dyn ToolRunner>,
}

impl AddonLintHandler {
    pub fn new(settings: Settings, runner: Arc<dyn ToolRunner>) -> Self {
        Self { settings, runner }
    }
}

impl CommandHandler for AddonLintHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let addon = required_str(input, "addon").map_err(HandlerFailure::validation)?;
        let dir = addon_dir(&self.settings.projects_root, addon)?;
        let mut args = vec![".".to_string()];
        // forward the addon's own linter config when it ships one
        if dir.join(".luacheckrc").is_file() {
            args.push("--config".to_string());
            args.push(".luacheckrc".to_string());
        }
        let invocation = self
            .runner
            .run(&self.settings.tools.linter, &args, &dir)
            .map_err(map_tool_error)?;
        let verdict = if invocation.exit_code == 0 {
            "clean"
        } else {
            "reported findings"
        };
        let reasoning = format!(
            "ran `{}` over addon `{addon}`; the tree is {verdict}",
            self.settings.tools.linter
        );
        Ok(HandlerOutput::new(invocation_data(&invocation), reasoning)
            .with_sources(vec![dir.display().to_string()]))
    }
}

pub struct AddonFormatHandler {
    settings: Settings,
    runner: Arc<dyn ToolRunner>,
}

impl AddonFormatHandler {
    pub fn new(settings: Settings, runner: Arc<dyn ToolRunner>) -> Self {
        Self { settings, runner }
    }
}

impl CommandHandler for AddonFormatHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let addon = required_str(input, "addon").map_err(HandlerFailure::validation)?;
        let check_only = optional_bool(input, "check");
        let dir = addon_dir(&self.settings.projects_root, addon)?;
        let mut args = Vec::new();
        if check_only {
            args.push("--check".to_string());
        }
        args.push(".".to_string());
        let invocation = self
            .runner
            .run(&self.settings.tools.formatter, &args, &dir)
            .map_err(map_tool_error)?;
        let mode = if check_only { "checked" } else { "formatted" };
        let reasoning = format!(
            "{mode} addon `{addon}` with `{}`",
            self.settings.tools.formatter
        );
        Ok(HandlerOutput::new(invocation_data(&invocation), reasoning)
            .with_sources(vec![dir.display().to_string()]))
    }
}

pub struct EnvStatusHandler {
    settings: Settings,
    state_root: PathBuf,
}

impl EnvStatusHandler {
    pub fn new(settings: Settings, state_root: PathBuf) -> Self {
        Self {
            settings,
            state_root,
        }
    }
}

impl CommandHandler for EnvStatusHandler {
    fn handle(&self, _input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let api_key_present = std::env::var(&self.settings.research.api_key_env)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        let data = json!({
            "projects_root": self.settings.projects_root.display().to_string(),
            "state_root": self.state_root.display().to_string(),
            "projects_root_exists": self.settings.projects_root.is_dir(),
            "research_api_key_present": api_key_present,
            "gate_rules": self.settings.gate_rules.len(),
        });
        Ok(HandlerOutput::new(
            data,
            "inspected configured paths and research credentials",
        ))
    }
}

pub struct ToolsStatusHandler {
    settings: Settings,
    runner: Arc<dyn ToolRunner>,
}

impl ToolsStatusHandler {
    pub fn new(settings: Settings, runner: Arc<dyn ToolRunner>) -> Self {
        Self { settings, runner }
    }

    fn probe(&self, tool: &str) -> Value {
        let args = vec!["--version".to_string()];
        match self.runner.run(tool, &args, Path::new(".")) {
            Ok(invocation) if invocation.exit_code == 0 => {
                let version = invocation
                    .stdout
                    .lines()
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_string();
                json!({"tool": tool, "available": true, "version": version})
            }
            Ok(invocation) => {
                json!({"tool": tool, "available": false, "detail": invocation.stderr.trim()})
            }
            Err(error) => json!({"tool": tool, "available": false, "detail": error.to_string()}),
        }
    }
}

impl CommandHandler for ToolsStatusHandler {
    fn handle(&self, _input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let linter = self.probe(&self.settings.tools.linter);
        let formatter = self.probe(&self.settings.tools.formatter);
        let data = json!({"linter": linter, "formatter": formatter});
        Ok(HandlerOutput::new(
            data,
            "probed the configured linter and formatter binaries",
        ))
    }
}
