use crate::commands::dispatch::{required_f64, required_str};
use crate::commands::envelope::{ErrorKind, HandlerFailure, HandlerOutput};
use crate::commands::registry::CommandHandler;
use crate::perf::{PerfError, PerfMeasurement, PerfStore};
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn map_perf_error(error: PerfError) -> HandlerFailure {
    let message = error.to_string();
    let kind = match error {
        PerfError::NoBaseline { .. } => ErrorKind::NotFound,
        PerfError::Validation(_) => ErrorKind::ValidationError,
        PerfError::Io { .. } | PerfError::Json { .. } => ErrorKind::Internal,
    };
    HandlerFailure::new(kind, message)
}

pub struct PerfBaselineHandler {
    store: Arc<PerfStore>,
}

impl PerfBaselineHandler {
    pub fn new(store: Arc<PerfStore>) -> Self {
        Self { store }
    }
}

impl CommandHandler for PerfBaselineHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let addon = required_str(input, "addon").map_err(HandlerFailure::validation)?;
        let measurement = PerfMeasurement {
            version: required_str(input, "version")
                .map_err(HandlerFailure::validation)?
                .to_string(),
            memory_kb: required_f64(input, "memory_kb").map_err(HandlerFailure::validation)?,
            cpu_ms: required_f64(input, "cpu_ms").map_err(HandlerFailure::validation)?,
            recorded_at: chrono::Utc::now().timestamp(),
        };
        let version = measurement.version.clone();
        let memory_kb = measurement.memory_kb;
        let cpu_ms = measurement.cpu_ms;
        self.store
            .record_baseline(addon, measurement)
            .map_err(map_perf_error)?;
        let reasoning = format!("recorded baseline `{version}` for addon `{addon}`");
        Ok(HandlerOutput::new(
            json!({
                "addon": addon,
                "version": version,
                "memory_kb": memory_kb,
                "cpu_ms": cpu_ms,
            }),
            reasoning,
        ))
    }
}

pub struct PerfCompareHandler {
    store: Arc<PerfStore>,
}

impl PerfCompareHandler {
    pub fn new(store: Arc<PerfStore>) -> Self {
        Self { store }
    }
}

impl CommandHandler for PerfCompareHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let addon = required_str(input, "addon").map_err(HandlerFailure::validation)?;
        let memory_kb = required_f64(input, "memory_kb").map_err(HandlerFailure::validation)?;
        let cpu_ms = required_f64(input, "cpu_ms").map_err(HandlerFailure::validation)?;
        // an addon without a baseline compares clean rather than erroring
        let comparison = match self.store.compare(addon, memory_kb, cpu_ms) {
            Ok(comparison) => comparison,
            Err(PerfError::NoBaseline { .. }) => {
                return Ok(HandlerOutput::new(
                    json!({"has_regression": false, "baseline_version": Value::Null}),
                    format!("addon `{addon}` has no recorded baseline to compare against"),
                ));
            }
            Err(other) => return Err(map_perf_error(other)),
        };
        let verdict = if comparison.has_regression {
            "a regression"
        } else {
            "within tolerance"
        };
        let reasoning = format!(
            "compared addon `{addon}` against baseline `{}`; the measurement is {verdict}",
            comparison.baseline_version
        );
        let data = serde_json::to_value(&comparison)
            .map_err(|err| HandlerFailure::internal(format!("comparison serialization failed: {err}")))?;
        Ok(HandlerOutput::new(data, reasoning).with_sources(vec![format!("perf/{addon}")]))
    }
}

pub struct PerfListHandler {
    store: Arc<PerfStore>,
}

impl PerfListHandler {
    pub fn new(store: Arc<PerfStore>) -> Self {
        Self { store }
    }
}

impl CommandHandler for PerfListHandler {
    fn handle(&self, _input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let addons = self.store.list_addons().map_err(map_perf_error)?;
        let reasoning = format!("{} addon(s) have recorded baselines", addons.len());
        Ok(HandlerOutput::new(
            json!({"addons": addons, "count": addons.len()}),
            reasoning,
        ))
    }
}

pub struct PerfReportHandler {
    store: Arc<PerfStore>,
}

impl PerfReportHandler {
    pub fn new(store: Arc<PerfStore>) -> Self {
        Self { store }
    }
}

impl CommandHandler for PerfReportHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let addon = required_str(input, "addon").map_err(HandlerFailure::validation)?;
        // unknown addons report an empty history rather than erroring
        let history = match self.store.history(addon) {
            Ok(history) => history,
            Err(PerfError::NoBaseline { .. }) => Vec::new(),
            Err(other) => return Err(map_perf_error(other)),
        };
        let reasoning = format!(
            "addon `{addon}` has {} recorded measurement(s)",
            history.len()
        );
        let data = serde_json::to_value(&history)
            .map_err(|err| HandlerFailure::internal(format!("history serialization failed: {err}")))?;
        Ok(HandlerOutput::new(json!({"addon": addon, "history": data}), reasoning)
            .with_sources(vec![format!("perf/{addon}")]))
    }
}
