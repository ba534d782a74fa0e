use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::ids::generate_compact_id;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const ID_ALLOCATION_ATTEMPTS: u32 = 8;

#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("proposal rejected: {0}")]
    Validation(String),
    #[error("failed to allocate a proposal id: {0}")]
    IdAllocation(String),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn parse(raw: &str) -> Result<Self, ProposalError> {
        match raw {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(ProposalError::Validation(format!(
                "risk_level must be low, medium or high, got `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn parse(raw: &str) -> Result<Self, ProposalError> {
        match raw {
            "pending" => Ok(ProposalStatus::Pending),
            "accepted" => Ok(ProposalStatus::Accepted),
            "rejected" => Ok(ProposalStatus::Rejected),
            other => Err(ProposalError::Validation(format!(
                "status must be pending, accepted or rejected, got `{other}`"
            ))),
        }
    }
}

/// Draft of a proposal before it has an id or a stored status.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalDraft {
    pub title: String,
    pub proposal_type: String,
    pub suggested_change: String,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub evidence_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProposalRecord {
    pub proposal_id: String,
    pub title: String,
    pub proposal_type: String,
    pub suggested_change: String,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub evidence_refs: Vec<String>,
    pub status: ProposalStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposalFilters {
    pub proposal_type: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub status: Option<ProposalStatus>,
}

/// One page of proposals: `total` counts every match, `items` holds at most
/// the requested limit, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ProposalPage {
    pub items: Vec<ProposalRecord>,
    pub total: usize,
}

/// File-backed proposal store: one JSON document per proposal under
/// `proposals/`.
#[derive(Debug, Clone)]
pub struct ProposalStore {
    state_root: PathBuf,
}

impl ProposalStore {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
        }
    }

    fn proposals_dir(&self) -> PathBuf {
        self.state_root.join("proposals")
    }

    fn proposal_path(&self, proposal_id: &str) -> PathBuf {
        self.proposals_dir().join(format!("{proposal_id}.json"))
    }

    /// Validates and persists a draft, allocating a fresh id. Ids embed a
    /// timestamp plus randomness; an on-disk collision triggers a re-draw.
    pub fn create(&self, draft: ProposalDraft, now: i64) -> Result<ProposalRecord, ProposalError> {
        if draft.title.trim().is_empty() {
            return Err(ProposalError::Validation(
                "title must be non-empty".to_string(),
            ));
        }
        if draft.suggested_change.trim().is_empty() {
            return Err(ProposalError::Validation(
                "suggested_change must be non-empty".to_string(),
            ));
        }
        crate::shared::ids::validate_identifier_value("proposal_type", &draft.proposal_type)
            .map_err(ProposalError::Validation)?;
        if !(0.0..=1.0).contains(&draft.confidence) {
            return Err(ProposalError::Validation(format!(
                "confidence must be within [0.0, 1.0], got {}",
                draft.confidence
            )));
        }

        let proposal_id = self.allocate_id(now)?;
        let record = ProposalRecord {
            proposal_id,
            title: draft.title,
            proposal_type: draft.proposal_type,
            suggested_change: draft.suggested_change,
            confidence: draft.confidence,
            risk_level: draft.risk_level,
            evidence_refs: draft.evidence_refs,
            status: ProposalStatus::Pending,
            created_at: now,
        };
        self.save(&record)?;
        Ok(record)
    }

    fn allocate_id(&self, now: i64) -> Result<String, ProposalError> {
        for _ in 0..ID_ALLOCATION_ATTEMPTS {
            let candidate =
                generate_compact_id("proposal", now).map_err(ProposalError::IdAllocation)?;
            if !self.proposal_path(&candidate).exists() {
                return Ok(candidate);
            }
        }
        Err(ProposalError::IdAllocation(format!(
            "no free proposal id after {ID_ALLOCATION_ATTEMPTS} attempts"
        )))
    }

    fn save(&self, record: &ProposalRecord) -> Result<(), ProposalError> {
        let path = self.proposal_path(&record.proposal_id);
        let json =
            serde_json::to_string_pretty(record).map_err(|source| ProposalError::Json {
                path: path.display().to_string(),
                source,
            })?;
        atomic_write_file(&path, json.as_bytes()).map_err(|source| ProposalError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn load_all(&self) -> Result<Vec<ProposalRecord>, ProposalError> {
        let dir = self.proposals_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(ProposalError::Io {
                    path: dir.display().to_string(),
                    source,
                });
            }
        };
        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ProposalError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.extension().map(|ext| ext == "json") != Some(true) {
                continue;
            }
            let raw = fs::read_to_string(&path).map_err(|source| ProposalError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let record = serde_json::from_str(&raw).map_err(|source| ProposalError::Json {
                path: path.display().to_string(),
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Lists proposals newest first. `total` reflects every record matching
    /// the filters, even when `limit` truncates the page.
    pub fn list(
        &self,
        limit: usize,
        filters: &ProposalFilters,
    ) -> Result<ProposalPage, ProposalError> {
        let mut matches: Vec<ProposalRecord> = self
            .load_all()?
            .into_iter()
            .filter(|record| {
                filters
                    .proposal_type
                    .as_ref()
                    .map(|wanted| &record.proposal_type == wanted)
                    .unwrap_or(true)
                    && filters
                        .risk_level
                        .map(|wanted| record.risk_level == wanted)
                        .unwrap_or(true)
                    && filters
                        .status
                        .map(|wanted| record.status == wanted)
                        .unwrap_or(true)
            })
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.proposal_id.cmp(&a.proposal_id))
        });
        let total = matches.len();
        matches.truncate(limit);
        Ok(ProposalPage {
            items: matches,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, risk: RiskLevel) -> ProposalDraft {
        ProposalDraft {
            title: title.to_string(),
            proposal_type: "rule".to_string(),
            suggested_change: "cache the texture handle".to_string(),
            confidence: 0.8,
            risk_level: risk,
            evidence_refs: vec!["perf/PixelCooldown".to_string()],
        }
    }

    #[test]
    fn create_assigns_prefixed_id_and_pending_status() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProposalStore::new(dir.path());
        let record = store
            .create(draft("cache textures", RiskLevel::Low), 1_700_000_000)
            .expect("create");
        assert!(record.proposal_id.starts_with("proposal-"));
        assert_eq!(record.status, ProposalStatus::Pending);
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProposalStore::new(dir.path());
        let mut bad = draft("over", RiskLevel::Low);
        bad.confidence = 1.5;
        let err = store.create(bad, 1_700_000_000).unwrap_err();
        assert!(matches!(err, ProposalError::Validation(_)));
    }

    #[test]
    fn list_orders_newest_first_and_reports_total_past_the_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProposalStore::new(dir.path());
        store
            .create(draft("older", RiskLevel::Low), 1_700_000_000)
            .expect("older");
        store
            .create(draft("newer", RiskLevel::High), 1_700_000_100)
            .expect("newer");
        store
            .create(draft("newest", RiskLevel::High), 1_700_000_200)
            .expect("newest");

        let page = store.list(2, &ProposalFilters::default()).expect("list");
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].title, "newest");
        assert_eq!(page.items[1].title, "newer");
    }

    #[test]
    fn filters_narrow_both_items_and_total() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProposalStore::new(dir.path());
        store
            .create(draft("low", RiskLevel::Low), 1_700_000_000)
            .expect("low");
        store
            .create(draft("high", RiskLevel::High), 1_700_000_100)
            .expect("high");

        let filters = ProposalFilters {
            risk_level: Some(RiskLevel::High),
            ..ProposalFilters::default()
        };
        let page = store.list(10, &filters).expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "high");
    }

    #[test]
    fn risk_level_parse_round_trip() {
        assert_eq!(RiskLevel::parse("medium").expect("medium"), RiskLevel::Medium);
        assert!(RiskLevel::parse("extreme").is_err());
        assert!(ProposalStatus::parse("accepted").is_ok());
        assert!(ProposalStatus::parse("done").is_err());
    }
}
