use crate::commands::dispatch::{optional_object, required_f64, required_str, required_usize};
use crate::commands::envelope::{ErrorKind, HandlerFailure, HandlerOutput};
use crate::commands::registry::CommandHandler;
use crate::proposal::{
    ProposalDraft, ProposalError, ProposalFilters, ProposalStatus, ProposalStore, RiskLevel,
};
use serde_json::{Map, Value};
use std::sync::Arc;

fn map_proposal_error(error: ProposalError) -> HandlerFailure {
    let message = error.to_string();
    let kind = match error {
        ProposalError::Validation(_) => ErrorKind::ValidationError,
        ProposalError::IdAllocation(_) | ProposalError::Io { .. } | ProposalError::Json { .. } => {
            ErrorKind::Internal
        }
    };
    HandlerFailure::new(kind, message)
}

pub struct ProposalCreateHandler {
    store: Arc<ProposalStore>,
}

impl ProposalCreateHandler {
    pub fn new(store: Arc<ProposalStore>) -> Self {
        Self { store }
    }
}

impl CommandHandler for ProposalCreateHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let risk_raw = required_str(input, "risk_level").map_err(HandlerFailure::validation)?;
        let risk_level = RiskLevel::parse(risk_raw).map_err(map_proposal_error)?;
        let evidence_refs = input
            .get("evidence_refs")
            .and_then(Value::as_array)
            .ok_or_else(|| HandlerFailure::validation("missing required field `evidence_refs`"))?
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    HandlerFailure::validation("evidence_refs entries must be strings")
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let draft = ProposalDraft {
            title: required_str(input, "title")
                .map_err(HandlerFailure::validation)?
                .to_string(),
            proposal_type: required_str(input, "proposal_type")
                .map_err(HandlerFailure::validation)?
                .to_string(),
            suggested_change: required_str(input, "suggested_change")
                .map_err(HandlerFailure::validation)?
                .to_string(),
            confidence: required_f64(input, "confidence").map_err(HandlerFailure::validation)?,
            risk_level,
            evidence_refs,
        };

        let now = chrono::Utc::now().timestamp();
        let record = self.store.create(draft, now).map_err(map_proposal_error)?;
        let sources = record.evidence_refs.clone();
        let reasoning = format!(
            "recorded proposal `{}` with {} evidence reference(s)",
            record.proposal_id,
            record.evidence_refs.len()
        );
        let data = serde_json::to_value(&record)
            .map_err(|err| HandlerFailure::internal(format!("proposal serialization failed: {err}")))?;
        Ok(HandlerOutput::new(data, reasoning).with_sources(sources))
    }
}

pub struct ProposalListHandler {
    store: Arc<ProposalStore>,
}

impl ProposalListHandler {
    pub fn new(store: Arc<ProposalStore>) -> Self {
        Self { store }
    }
}

impl CommandHandler for ProposalListHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let limit = required_usize(input, "limit").map_err(HandlerFailure::validation)?;
        let mut filters = ProposalFilters::default();
        if let Some(raw) = optional_object(input, "filters") {
            for key in raw.keys() {
                if !matches!(key.as_str(), "proposal_type" | "risk_level" | "status") {
                    return Err(HandlerFailure::validation(format!(
                        "unknown filter `{key}`"
                    )));
                }
            }
            if let Some(proposal_type) = raw.get("proposal_type").and_then(Value::as_str) {
                filters.proposal_type = Some(proposal_type.to_string());
            }
            if let Some(risk) = raw.get("risk_level").and_then(Value::as_str) {
                filters.risk_level = Some(RiskLevel::parse(risk).map_err(map_proposal_error)?);
            }
            if let Some(status) = raw.get("status").and_then(Value::as_str) {
                filters.status = Some(ProposalStatus::parse(status).map_err(map_proposal_error)?);
            }
        }

        let page = self.store.list(limit, &filters).map_err(map_proposal_error)?;
        let reasoning = format!(
            "listed {} of {} matching proposal(s), newest first",
            page.items.len(),
            page.total
        );
        let data = serde_json::to_value(&page)
            .map_err(|err| HandlerFailure::internal(format!("proposal serialization failed: {err}")))?;
        Ok(HandlerOutput::new(data, reasoning))
    }
}
