use crate::workflow::job::JobKind;
use crate::workflow::task::BudgetClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
}

/// Scheduling/retry bounds for one budget class. Budget classes bound retry
/// effort and per-task concurrency, never wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BudgetLimits {
    pub max_retries: u32,
    pub max_parallel_jobs: u32,
}

/// One gate policy rule: when a task declares `constraint: true`, jobs of the
/// listed kinds require human sign-off before they may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GateRule {
    pub constraint: String,
    pub gated_kinds: Vec<JobKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ToolSettings {
    #[serde(default = "default_linter")]
    pub linter: String,
    #[serde(default = "default_formatter")]
    pub formatter: String,
}

fn default_linter() -> String {
    "luacheck".to_string()
}

fn default_formatter() -> String {
    "stylua".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            linter: default_linter(),
            formatter: default_formatter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResearchSettings {
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub endpoint: String,
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_projects_root")]
    pub projects_root: PathBuf,
    #[serde(default)]
    pub budgets: BTreeMap<BudgetClass, BudgetLimits>,
    #[serde(default = "default_gate_rules")]
    pub gate_rules: Vec<GateRule>,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub research: ResearchSettings,
}

fn default_projects_root() -> PathBuf {
    PathBuf::from("projects")
}

pub fn default_gate_rules() -> Vec<GateRule> {
    vec![
        GateRule {
            constraint: "no_auto_merge".to_string(),
            gated_kinds: vec![JobKind::Propose, JobKind::Publish],
        },
        GateRule {
            constraint: "require_plan_review".to_string(),
            gated_kinds: vec![JobKind::Plan],
        },
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            projects_root: default_projects_root(),
            budgets: BTreeMap::new(),
            gate_rules: default_gate_rules(),
            tools: ToolSettings::default(),
            research: ResearchSettings::default(),
        }
    }
}

impl Settings {
    /// Effective limits for a budget class; falls back to built-in defaults
    /// when the settings file does not override the class.
    pub fn budget_limits(&self, class: BudgetClass) -> BudgetLimits {
        if let Some(limits) = self.budgets.get(&class) {
            return *limits;
        }
        match class {
            BudgetClass::Standard => BudgetLimits {
                max_retries: 2,
                max_parallel_jobs: 2,
            },
            BudgetClass::Extended => BudgetLimits {
                max_retries: 4,
                max_parallel_jobs: 4,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (class, limits) in &self.budgets {
            if limits.max_parallel_jobs == 0 {
                return Err(ConfigError::Settings(format!(
                    "budget class `{class}` must allow at least one parallel job"
                )));
            }
        }
        for rule in &self.gate_rules {
            crate::shared::ids::validate_identifier_value("gate constraint", &rule.constraint)
                .map_err(ConfigError::Settings)?;
            if rule.gated_kinds.is_empty() {
                return Err(ConfigError::Settings(format!(
                    "gate rule `{}` must name at least one job kind",
                    rule.constraint
                )));
            }
        }
        if self.tools.linter.trim().is_empty() || self.tools.formatter.trim().is_empty() {
            return Err(ConfigError::Settings(
                "tool binaries must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let settings: Settings = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        Settings::default().validate().expect("defaults");
    }

    #[test]
    fn budget_fallbacks_cover_both_classes() {
        let settings = Settings::default();
        assert_eq!(settings.budget_limits(BudgetClass::Standard).max_retries, 2);
        assert_eq!(settings.budget_limits(BudgetClass::Extended).max_retries, 4);
    }

    #[test]
    fn yaml_overrides_merge_over_defaults() {
        let settings: Settings = serde_yaml::from_str(
            r#"
budgets:
  standard:
    max_retries: 1
    max_parallel_jobs: 1
tools:
  linter: selene
"#,
        )
        .expect("yaml");
        settings.validate().expect("valid");
        assert_eq!(settings.budget_limits(BudgetClass::Standard).max_retries, 1);
        assert_eq!(settings.tools.linter, "selene");
        assert_eq!(settings.tools.formatter, "stylua");
        assert!(!settings.gate_rules.is_empty());
    }

    #[test]
    fn zero_parallel_budget_is_rejected() {
        let settings: Settings = serde_yaml::from_str(
            r#"
budgets:
  extended:
    max_retries: 4
    max_parallel_jobs: 0
"#,
        )
        .expect("yaml");
        assert!(settings.validate().is_err());
    }
}
