use crate::shared::fs_atomic::atomic_write_file;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// A measurement at least this much worse than baseline counts as a
/// regression.
const REGRESSION_THRESHOLD_PCT: f64 = 10.0;

#[derive(Debug, thiserror::Error)]
pub enum PerfError {
    #[error("no baseline recorded for addon `{addon}`")]
    NoBaseline { addon: String },
    #[error("measurement rejected: {0}")]
    Validation(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PerfMeasurement {
    pub version: String,
    pub memory_kb: f64,
    pub cpu_ms: f64,
    pub recorded_at: i64,
}

/// Comparison of a fresh measurement against the latest stored baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PerfComparison {
    pub baseline_version: String,
    pub memory_delta_kb: f64,
    pub cpu_delta_ms: f64,
    pub memory_delta_pct: f64,
    pub cpu_delta_pct: f64,
    pub has_regression: bool,
}

/// Append-only baseline history, one JSON file per addon under `perf/`.
#[derive(Debug, Clone)]
pub struct PerfStore {
    state_root: PathBuf,
}

impl PerfStore {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
        }
    }

    fn perf_dir(&self) -> PathBuf {
        self.state_root.join("perf")
    }

    fn addon_path(&self, addon: &str) -> PathBuf {
        self.perf_dir().join(format!("{addon}.json"))
    }

    pub fn record_baseline(
        &self,
        addon: &str,
        measurement: PerfMeasurement,
    ) -> Result<(), PerfError> {
        crate::shared::ids::validate_identifier_value("addon name", addon)
            .map_err(PerfError::Validation)?;
        if measurement.memory_kb < 0.0 || measurement.cpu_ms < 0.0 {
            return Err(PerfError::Validation(
                "measurements must be non-negative".to_string(),
            ));
        }
        let mut history = match self.history(addon) {
            Ok(history) => history,
            Err(PerfError::NoBaseline { .. }) => Vec::new(),
            Err(other) => return Err(other),
        };
        history.push(measurement);
        let path = self.addon_path(addon);
        let json = serde_json::to_string_pretty(&history).map_err(|source| PerfError::Json {
            path: path.display().to_string(),
            source,
        })?;
        atomic_write_file(&path, json.as_bytes()).map_err(|source| PerfError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Full measurement history, oldest first.
    pub fn history(&self, addon: &str) -> Result<Vec<PerfMeasurement>, PerfError> {
        let path = self.addon_path(addon);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Err(PerfError::NoBaseline {
                    addon: addon.to_string(),
                });
            }
            Err(source) => {
                return Err(PerfError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| PerfError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Compares a measurement against the most recent baseline.
    pub fn compare(&self, addon: &str, memory_kb: f64, cpu_ms: f64) -> Result<PerfComparison, PerfError> {
        let history = self.history(addon)?;
        let baseline = history.last().ok_or_else(|| PerfError::NoBaseline {
            addon: addon.to_string(),
        })?;
        let memory_delta_kb = memory_kb - baseline.memory_kb;
        let cpu_delta_ms = cpu_ms - baseline.cpu_ms;
        let memory_delta_pct = percent_delta(baseline.memory_kb, memory_delta_kb);
        let cpu_delta_pct = percent_delta(baseline.cpu_ms, cpu_delta_ms);
        Ok(PerfComparison {
            baseline_version: baseline.version.clone(),
            memory_delta_kb,
            cpu_delta_ms,
            memory_delta_pct,
            cpu_delta_pct,
            has_regression: memory_delta_pct > REGRESSION_THRESHOLD_PCT
                || cpu_delta_pct > REGRESSION_THRESHOLD_PCT,
        })
    }

    pub fn list_addons(&self) -> Result<Vec<String>, PerfError> {
        let dir = self.perf_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PerfError::Io {
                    path: dir.display().to_string(),
                    source,
                });
            }
        };
        let mut addons = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| PerfError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let name = entry.file_name();
            if let Some(stem) = name.to_string_lossy().strip_suffix(".json") {
                addons.push(stem.to_string());
            }
        }
        addons.sort();
        Ok(addons)
    }
}

fn percent_delta(baseline: f64, delta: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    delta / baseline * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(version: &str, memory_kb: f64, cpu_ms: f64) -> PerfMeasurement {
        PerfMeasurement {
            version: version.to_string(),
            memory_kb,
            cpu_ms,
            recorded_at: 1_700_000_000,
        }
    }

    #[test]
    fn baseline_history_appends_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PerfStore::new(dir.path());
        store
            .record_baseline("PixelCooldown", measurement("1.0", 100.0, 10.0))
            .expect("first");
        store
            .record_baseline("PixelCooldown", measurement("1.1", 120.0, 9.0))
            .expect("second");
        let history = store.history("PixelCooldown").expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].version, "1.1");
    }

    #[test]
    fn compare_uses_the_latest_baseline_and_flags_regressions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PerfStore::new(dir.path());
        store
            .record_baseline("PixelCooldown", measurement("1.0", 100.0, 10.0))
            .expect("baseline");
        let comparison = store.compare("PixelCooldown", 130.0, 10.0).expect("compare");
        assert_eq!(comparison.baseline_version, "1.0");
        assert_eq!(comparison.memory_delta_kb, 30.0);
        assert!(comparison.has_regression);

        let fine = store.compare("PixelCooldown", 102.0, 9.0).expect("compare");
        assert!(!fine.has_regression);
    }

    #[test]
    fn compare_without_a_baseline_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PerfStore::new(dir.path());
        let err = store.compare("Ghost", 1.0, 1.0).unwrap_err();
        assert!(matches!(err, PerfError::NoBaseline { .. }));
    }

    #[test]
    fn list_addons_is_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PerfStore::new(dir.path());
        store
            .record_baseline("Beta", measurement("1.0", 1.0, 1.0))
            .expect("beta");
        store
            .record_baseline("Alpha", measurement("1.0", 1.0, 1.0))
            .expect("alpha");
        assert_eq!(store.list_addons().expect("list"), vec!["Alpha", "Beta"]);
    }
}
