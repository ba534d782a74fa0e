use crate::commands::dispatch::required_str;
use crate::commands::envelope::{ErrorKind, HandlerFailure, HandlerOutput};
use crate::commands::registry::CommandHandler;
use crate::config::ResearchSettings;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Answer returned by a research provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Seam for the external research backend; tests substitute a fake.
pub trait ResearchProvider: Send + Sync {
    fn query(&self, endpoint: &str, api_key: &str, query: &str)
        -> Result<ResearchAnswer, HandlerFailure>;
}

/// HTTP provider: POSTs the query as JSON and expects
/// `{"answer": "...", "sources": ["..."]}` back.
pub struct HttpResearchProvider;

impl ResearchProvider for HttpResearchProvider {
    fn query(
        &self,
        endpoint: &str,
        api_key: &str,
        query: &str,
    ) -> Result<ResearchAnswer, HandlerFailure> {
        let agent = ureq::AgentBuilder::new()
            .timeout(PROVIDER_TIMEOUT)
            .build();
        let response = agent
            .post(endpoint)
            .set("authorization", &format!("Bearer {api_key}"))
            .send_json(json!({ "query": query }))
            .map_err(|err| {
                HandlerFailure::internal(format!("research provider request failed: {err}"))
            })?;
        let body: Value = response.into_json().map_err(|err| {
            HandlerFailure::internal(format!("research provider returned invalid json: {err}"))
        })?;
        let answer = body
            .get("answer")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                HandlerFailure::internal("research provider response lacks an `answer` field")
            })?
            .to_string();
        let sources = body
            .get("sources")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ResearchAnswer { answer, sources })
    }
}

pub struct ResearchQueryHandler {
    settings: ResearchSettings,
    provider: Arc<dyn ResearchProvider>,
}

impl ResearchQueryHandler {
    pub fn new(settings: ResearchSettings, provider: Arc<dyn ResearchProvider>) -> Self {
        Self { settings, provider }
    }
}

impl CommandHandler for ResearchQueryHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let query = required_str(input, "query").map_err(HandlerFailure::validation)?;
        let api_key = std::env::var(&self.settings.api_key_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                HandlerFailure::new(
                    ErrorKind::ApiKeyMissing,
                    format!(
                        "research requires the `{}` environment variable",
                        self.settings.api_key_env
                    ),
                )
            })?;
        if self.settings.endpoint.trim().is_empty() {
            return Err(HandlerFailure::internal(
                "research endpoint is not configured",
            ));
        }
        let answer = self
            .provider
            .query(&self.settings.endpoint, &api_key, query)?;
        let reasoning = format!(
            "research provider answered with {} source(s)",
            answer.sources.len()
        );
        Ok(HandlerOutput::new(json!({"answer": answer.answer}), reasoning)
            .with_sources(answer.sources))
    }
}
