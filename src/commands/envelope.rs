use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error taxonomy shared by every command. Handlers pick from this set so
/// callers can branch on `kind` instead of parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    UnknownCommand,
    ValidationError,
    NotFound,
    DuplicateTask,
    InvalidState,
    FileNotFound,
    SourceNotFound,
    DatabaseNotFound,
    IndexNotFound,
    ApiKeyMissing,
    ToolMissing,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::DuplicateTask => "DUPLICATE_TASK",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::FileNotFound => "FILE_NOT_FOUND",
            ErrorKind::SourceNotFound => "SOURCE_NOT_FOUND",
            ErrorKind::DatabaseNotFound => "DATABASE_NOT_FOUND",
            ErrorKind::IndexNotFound => "INDEX_NOT_FOUND",
            ErrorKind::ApiKeyMissing => "API_KEY_MISSING",
            ErrorKind::ToolMissing => "TOOL_MISSING",
            ErrorKind::Internal => "INTERNAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Uniform result envelope. Exactly one of `data`/`error` is populated;
/// success always carries non-empty reasoning and a sources list (possibly
/// empty, but present).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandErrorBody>,
}

impl CommandResult {
    pub fn ok(data: Value, reasoning: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            reasoning: Some(reasoning.into()),
            sources: Some(sources),
            error: None,
        }
    }

    pub fn err(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            reasoning: None,
            sources: None,
            error: Some(CommandErrorBody {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|body| body.kind)
    }
}

/// What a handler returns on success before the dispatcher wraps it.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput {
    pub data: Value,
    pub reasoning: String,
    pub sources: Vec<String>,
}

impl HandlerOutput {
    pub fn new(data: Value, reasoning: impl Into<String>) -> Self {
        Self {
            data,
            reasoning: reasoning.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }
}

/// Typed handler failure; the dispatcher converts it into an error envelope.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct HandlerFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl HandlerFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_kinds_serialize_screaming_snake() {
        let raw = serde_json::to_string(&ErrorKind::UnknownCommand).expect("json");
        assert_eq!(raw, "\"UNKNOWN_COMMAND\"");
        assert_eq!(ErrorKind::ApiKeyMissing.to_string(), "API_KEY_MISSING");
    }

    #[test]
    fn success_envelope_populates_data_side_only() {
        let result = CommandResult::ok(json!({"n": 1}), "looked up n", vec!["db://n".to_string()]);
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.reasoning.as_deref(), Some("looked up n"));
        assert_eq!(result.sources.as_deref(), Some(&["db://n".to_string()][..]));
    }

    #[test]
    fn error_envelope_populates_error_side_only() {
        let result = CommandResult::err(ErrorKind::NotFound, "no such task");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
    }
}
