//! Static command table: names, caller-facing descriptions, and input
//! schemas. Handlers are attached at composition time by the server.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ArgType {
    pub fn expected_label(self) -> &'static str {
        match self {
            ArgType::String => "a string",
            ArgType::Integer => "an integer",
            ArgType::Number => "a number",
            ArgType::Boolean => "a boolean",
            ArgType::Object => "an object",
            ArgType::Array => "an array",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub arg_type: ArgType,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
    pub read_only: bool,
}

pub mod command_ids {
    pub const WORKFLOW_RUN: &str = "workflow.run";
    pub const WORKFLOW_STATUS: &str = "workflow.status";
    pub const WORKFLOW_RESUME: &str = "workflow.resume";
    pub const WORKFLOW_ABORT: &str = "workflow.abort";
    pub const PROPOSAL_CREATE: &str = "proposal.create";
    pub const PROPOSAL_LIST: &str = "proposal.list";
    pub const PERF_BASELINE: &str = "perf.baseline";
    pub const PERF_COMPARE: &str = "perf.compare";
    pub const PERF_LIST: &str = "perf.list";
    pub const PERF_REPORT: &str = "perf.report";
    pub const ADDON_LINT: &str = "addon.lint";
    pub const ADDON_FORMAT: &str = "addon.format";
    pub const RESEARCH_QUERY: &str = "research.query";
    pub const ENV_STATUS: &str = "env.status";
    pub const TOOLS_STATUS: &str = "tools.status";
    pub const DOCS_GENERATE: &str = "docs.generate";
}

const TASK_ID_ARG: ArgSpec = ArgSpec {
    name: "task_id",
    arg_type: ArgType::String,
    required: true,
    description: "Target task id",
};

const ADDON_ARG: ArgSpec = ArgSpec {
    name: "addon",
    arg_type: ArgType::String,
    required: true,
    description: "Addon name",
};

const WORKFLOW_RUN_ARGS: &[ArgSpec] = &[ArgSpec {
    name: "task",
    arg_type: ArgType::Object,
    required: true,
    description: "Task declaration: task_id, intent, context_refs, constraints, budget_class, task_class",
}];

const PROPOSAL_CREATE_ARGS: &[ArgSpec] = &[
    ArgSpec {
        name: "title",
        arg_type: ArgType::String,
        required: true,
        description: "Short proposal title",
    },
    ArgSpec {
        name: "proposal_type",
        arg_type: ArgType::String,
        required: true,
        description: "Proposal type: rule or code_change",
    },
    ArgSpec {
        name: "suggested_change",
        arg_type: ArgType::String,
        required: true,
        description: "Suggested change text",
    },
    ArgSpec {
        name: "confidence",
        arg_type: ArgType::Number,
        required: true,
        description: "Confidence in [0.0, 1.0]",
    },
    ArgSpec {
        name: "risk_level",
        arg_type: ArgType::String,
        required: true,
        description: "Risk level: low, medium or high",
    },
    ArgSpec {
        name: "evidence_refs",
        arg_type: ArgType::Array,
        required: true,
        description: "Ordered evidence reference strings",
    },
];

const PROPOSAL_LIST_ARGS: &[ArgSpec] = &[
    ArgSpec {
        name: "limit",
        arg_type: ArgType::Integer,
        required: true,
        description: "Maximum items to return",
    },
    ArgSpec {
        name: "filters",
        arg_type: ArgType::Object,
        required: false,
        description: "Optional filters: proposal_type, risk_level, status",
    },
];

const PERF_BASELINE_ARGS: &[ArgSpec] = &[
    ADDON_ARG,
    ArgSpec {
        name: "version",
        arg_type: ArgType::String,
        required: true,
        description: "Addon version for the measurement",
    },
    ArgSpec {
        name: "memory_kb",
        arg_type: ArgType::Number,
        required: true,
        description: "Measured memory in KB",
    },
    ArgSpec {
        name: "cpu_ms",
        arg_type: ArgType::Number,
        required: true,
        description: "Measured CPU time in ms",
    },
];

const PERF_COMPARE_ARGS: &[ArgSpec] = &[
    ADDON_ARG,
    ArgSpec {
        name: "memory_kb",
        arg_type: ArgType::Number,
        required: true,
        description: "Measured memory in KB",
    },
    ArgSpec {
        name: "cpu_ms",
        arg_type: ArgType::Number,
        required: true,
        description: "Measured CPU time in ms",
    },
];

const ADDON_FORMAT_ARGS: &[ArgSpec] = &[
    ADDON_ARG,
    ArgSpec {
        name: "check",
        arg_type: ArgType::Boolean,
        required: false,
        description: "Check only, do not rewrite files",
    },
];

const RESEARCH_QUERY_ARGS: &[ArgSpec] = &[ArgSpec {
    name: "query",
    arg_type: ArgType::String,
    required: true,
    description: "Research question to submit",
}];

const DOCS_GENERATE_ARGS: &[ArgSpec] = &[ArgSpec {
    name: "format",
    arg_type: ArgType::String,
    required: false,
    description: "Output format: markdown or json",
}];

pub const WORKFLOW_RUN_SPEC: CommandSpec = CommandSpec {
    name: command_ids::WORKFLOW_RUN,
    description: "Accept a task declaration and schedule its job graph",
    args: WORKFLOW_RUN_ARGS,
    read_only: false,
};

pub const WORKFLOW_STATUS_SPEC: CommandSpec = CommandSpec {
    name: command_ids::WORKFLOW_STATUS,
    description: "Read the computed status and job detail for a task",
    args: &[TASK_ID_ARG],
    read_only: true,
};

pub const WORKFLOW_RESUME_SPEC: CommandSpec = CommandSpec {
    name: command_ids::WORKFLOW_RESUME,
    description: "Approve the gated job and attempt to advance past the gate",
    args: &[TASK_ID_ARG],
    read_only: false,
};

pub const WORKFLOW_ABORT_SPEC: CommandSpec = CommandSpec {
    name: command_ids::WORKFLOW_ABORT,
    description: "Cancel a task and all of its non-terminal jobs",
    args: &[TASK_ID_ARG],
    read_only: false,
};

pub const PROPOSAL_CREATE_SPEC: CommandSpec = CommandSpec {
    name: command_ids::PROPOSAL_CREATE,
    description: "Record an evidence-backed change proposal",
    args: PROPOSAL_CREATE_ARGS,
    read_only: false,
};

pub const PROPOSAL_LIST_SPEC: CommandSpec = CommandSpec {
    name: command_ids::PROPOSAL_LIST,
    description: "List recorded proposals, most recent first",
    args: PROPOSAL_LIST_ARGS,
    read_only: true,
};

pub const PERF_BASELINE_SPEC: CommandSpec = CommandSpec {
    name: command_ids::PERF_BASELINE,
    description: "Record a performance baseline measurement for an addon",
    args: PERF_BASELINE_ARGS,
    read_only: false,
};

pub const PERF_COMPARE_SPEC: CommandSpec = CommandSpec {
    name: command_ids::PERF_COMPARE,
    description: "Compare a measurement against the stored baseline",
    args: PERF_COMPARE_ARGS,
    read_only: true,
};

pub const PERF_LIST_SPEC: CommandSpec = CommandSpec {
    name: command_ids::PERF_LIST,
    description: "List addons that have recorded performance baselines",
    args: &[],
    read_only: true,
};

pub const PERF_REPORT_SPEC: CommandSpec = CommandSpec {
    name: command_ids::PERF_REPORT,
    description: "Read the full baseline history for one addon",
    args: &[ADDON_ARG],
    read_only: true,
};

pub const ADDON_LINT_SPEC: CommandSpec = CommandSpec {
    name: command_ids::ADDON_LINT,
    description: "Run the configured linter over an addon directory",
    args: &[ADDON_ARG],
    read_only: true,
};

pub const ADDON_FORMAT_SPEC: CommandSpec = CommandSpec {
    name: command_ids::ADDON_FORMAT,
    description: "Run the configured formatter over an addon directory",
    args: ADDON_FORMAT_ARGS,
    read_only: false,
};

pub const RESEARCH_QUERY_SPEC: CommandSpec = CommandSpec {
    name: command_ids::RESEARCH_QUERY,
    description: "Submit a research query to the configured provider",
    args: RESEARCH_QUERY_ARGS,
    read_only: true,
};

pub const ENV_STATUS_SPEC: CommandSpec = CommandSpec {
    name: command_ids::ENV_STATUS,
    description: "Report environment configuration and state paths",
    args: &[],
    read_only: true,
};

pub const TOOLS_STATUS_SPEC: CommandSpec = CommandSpec {
    name: command_ids::TOOLS_STATUS,
    description: "Report configured external tools and their availability",
    args: &[],
    read_only: true,
};

pub const DOCS_GENERATE_SPEC: CommandSpec = CommandSpec {
    name: command_ids::DOCS_GENERATE,
    description: "Generate command-surface documentation from the registry",
    args: DOCS_GENERATE_ARGS,
    read_only: true,
};

/// Every command the server registers, in registration order.
pub const V1_COMMANDS: &[&CommandSpec] = &[
    &WORKFLOW_RUN_SPEC,
    &WORKFLOW_STATUS_SPEC,
    &WORKFLOW_RESUME_SPEC,
    &WORKFLOW_ABORT_SPEC,
    &PROPOSAL_CREATE_SPEC,
    &PROPOSAL_LIST_SPEC,
    &PERF_BASELINE_SPEC,
    &PERF_COMPARE_SPEC,
    &PERF_LIST_SPEC,
    &PERF_REPORT_SPEC,
    &ADDON_LINT_SPEC,
    &ADDON_FORMAT_SPEC,
    &RESEARCH_QUERY_SPEC,
    &ENV_STATUS_SPEC,
    &TOOLS_STATUS_SPEC,
    &DOCS_GENERATE_SPEC,
];
