//! Composition root: builds the stores, the engine, the handler set and the
//! dispatcher, and optionally starts the background workers.

use crate::commands::catalog;
use crate::commands::dispatch::Dispatcher;
use crate::commands::envelope::CommandResult;
use crate::commands::registry::{CommandRegistry, RegistryError};
use crate::config::Settings;
use crate::handlers::{
    AddonFormatHandler, AddonLintHandler, DocsGenerateHandler, EnvStatusHandler,
    HttpResearchProvider, PerfBaselineHandler, PerfCompareHandler, PerfListHandler,
    PerfReportHandler, ProposalCreateHandler, ProposalListHandler, ResearchProvider,
    ResearchQueryHandler, SystemToolRunner, ToolRunner, ToolsStatusHandler, WorkflowAbortHandler,
    WorkflowResumeHandler, WorkflowRunHandler, WorkflowStatusHandler,
};
use crate::perf::PerfStore;
use crate::proposal::ProposalStore;
use crate::runtime::{spawn_completion_worker, spawn_scheduler_worker, WorkerHandle};
use crate::workflow::executor::{JobCompletion, JobRunner, NoopJobRunner, ThreadJobExecutor};
use crate::workflow::store::WorkflowStateStore;
use crate::workflow::WorkflowEngine;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// Everything a deployment swaps out; defaults cover production use.
pub struct ServerParts {
    pub job_runner: Arc<dyn JobRunner>,
    pub tool_runner: Arc<dyn ToolRunner>,
    pub research_provider: Arc<dyn ResearchProvider>,
}

impl Default for ServerParts {
    fn default() -> Self {
        Self {
            job_runner: Arc::new(NoopJobRunner),
            tool_runner: Arc::new(SystemToolRunner),
            research_provider: Arc::new(HttpResearchProvider),
        }
    }
}

pub struct MechanicServer {
    dispatcher: Dispatcher,
    engine: Arc<WorkflowEngine>,
    state_root: PathBuf,
    completions: Mutex<Option<mpsc::Receiver<JobCompletion>>>,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl MechanicServer {
    pub fn new(state_root: &Path, settings: Settings) -> Result<Self, RegistryError> {
        Self::with_parts(state_root, settings, ServerParts::default())
    }

    pub fn with_parts(
        state_root: &Path,
        settings: Settings,
        parts: ServerParts,
    ) -> Result<Self, RegistryError> {
        let (completion_tx, completion_rx) = mpsc::channel();
        let executor = Arc::new(ThreadJobExecutor::new(parts.job_runner, completion_tx));
        let engine = Arc::new(WorkflowEngine::new(
            WorkflowStateStore::new(state_root),
            settings.clone(),
            executor,
        ));
        let proposal_store = Arc::new(ProposalStore::new(state_root));
        let perf_store = Arc::new(PerfStore::new(state_root));

        let mut registry = CommandRegistry::new();
        registry.register(
            &catalog::WORKFLOW_RUN_SPEC,
            Arc::new(WorkflowRunHandler::new(Arc::clone(&engine))),
        )?;
        registry.register(
            &catalog::WORKFLOW_STATUS_SPEC,
            Arc::new(WorkflowStatusHandler::new(Arc::clone(&engine))),
        )?;
        registry.register(
            &catalog::WORKFLOW_RESUME_SPEC,
            Arc::new(WorkflowResumeHandler::new(Arc::clone(&engine))),
        )?;
        registry.register(
            &catalog::WORKFLOW_ABORT_SPEC,
            Arc::new(WorkflowAbortHandler::new(Arc::clone(&engine))),
        )?;
        registry.register(
            &catalog::PROPOSAL_CREATE_SPEC,
            Arc::new(ProposalCreateHandler::new(Arc::clone(&proposal_store))),
        )?;
        registry.register(
            &catalog::PROPOSAL_LIST_SPEC,
            Arc::new(ProposalListHandler::new(proposal_store)),
        )?;
        registry.register(
            &catalog::PERF_BASELINE_SPEC,
            Arc::new(PerfBaselineHandler::new(Arc::clone(&perf_store))),
        )?;
        registry.register(
            &catalog::PERF_COMPARE_SPEC,
            Arc::new(PerfCompareHandler::new(Arc::clone(&perf_store))),
        )?;
        registry.register(
            &catalog::PERF_LIST_SPEC,
            Arc::new(PerfListHandler::new(Arc::clone(&perf_store))),
        )?;
        registry.register(
            &catalog::PERF_REPORT_SPEC,
            Arc::new(PerfReportHandler::new(perf_store)),
        )?;
        registry.register(
            &catalog::ADDON_LINT_SPEC,
            Arc::new(AddonLintHandler::new(
                settings.clone(),
                Arc::clone(&parts.tool_runner),
            )),
        )?;
        registry.register(
            &catalog::ADDON_FORMAT_SPEC,
            Arc::new(AddonFormatHandler::new(
                settings.clone(),
                Arc::clone(&parts.tool_runner),
            )),
        )?;
        registry.register(
            &catalog::RESEARCH_QUERY_SPEC,
            Arc::new(ResearchQueryHandler::new(
                settings.research.clone(),
                parts.research_provider,
            )),
        )?;
        registry.register(
            &catalog::ENV_STATUS_SPEC,
            Arc::new(EnvStatusHandler::new(
                settings.clone(),
                state_root.to_path_buf(),
            )),
        )?;
        registry.register(
            &catalog::TOOLS_STATUS_SPEC,
            Arc::new(ToolsStatusHandler::new(settings, parts.tool_runner)),
        )?;
        registry.register(&catalog::DOCS_GENERATE_SPEC, Arc::new(DocsGenerateHandler))?;

        Ok(Self {
            dispatcher: Dispatcher::new(Arc::new(registry)),
            engine,
            state_root: state_root.to_path_buf(),
            completions: Mutex::new(Some(completion_rx)),
            workers: Mutex::new(Vec::new()),
        })
    }

    pub fn dispatch(&self, command_name: &str, input: &Map<String, Value>) -> CommandResult {
        self.dispatcher.dispatch(command_name, input)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    /// Starts the completion and scheduler workers. Without this call the
    /// server only makes progress when a caller advances tasks explicitly.
    /// Calling it twice is a no-op.
    pub fn start_workers(&self, poll: Duration) {
        let receiver = {
            let mut slot = self
                .completions
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.take()
        };
        let Some(receiver) = receiver else {
            return;
        };
        let mut workers = self
            .workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        workers.push(spawn_completion_worker(Arc::clone(&self.engine), receiver));
        workers.push(spawn_scheduler_worker(Arc::clone(&self.engine), poll));
    }

    /// Signals every worker to stop and joins them.
    pub fn stop_workers(&self) {
        let drained: Vec<WorkerHandle> = {
            let mut workers = self
                .workers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            workers.drain(..).collect()
        };
        for worker in drained {
            worker.stop();
        }
    }
}

impl Drop for MechanicServer {
    fn drop(&mut self) {
        self.stop_workers();
    }
}
