pub mod docs;
pub mod perf;
pub mod proposal;
pub mod research;
pub mod tooling;
pub mod workflow;

pub use docs::DocsGenerateHandler;
pub use perf::{PerfBaselineHandler, PerfCompareHandler, PerfListHandler, PerfReportHandler};
pub use proposal::{ProposalCreateHandler, ProposalListHandler};
pub use research::{HttpResearchProvider, ResearchAnswer, ResearchProvider, ResearchQueryHandler};
pub use tooling::{
    AddonFormatHandler, AddonLintHandler, EnvStatusHandler, SystemToolRunner, ToolInvocation,
    ToolRunError, ToolRunner, ToolsStatusHandler,
};
pub use workflow::{
    WorkflowAbortHandler, WorkflowResumeHandler, WorkflowRunHandler, WorkflowStatusHandler,
};
