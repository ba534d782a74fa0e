use crate::commands::catalog::CommandSpec;
use crate::commands::envelope::{HandlerFailure, HandlerOutput};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Minimum caller-facing description length the registry accepts; discovery
/// clients rely on descriptions being meaningful.
const MIN_DESCRIPTION_LEN: usize = 11;

pub trait CommandHandler: Send + Sync {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("command `{name}` is already registered")]
    DuplicateCommand { name: String },
    #[error("command `{name}` has an unusable description (need > 10 chars)")]
    DescriptionTooShort { name: String },
    #[error("command name `{name}` is invalid: {reason}")]
    InvalidName { name: String, reason: String },
}

#[derive(Clone)]
pub struct RegisteredCommand {
    pub spec: &'static CommandSpec,
    pub handler: Arc<dyn CommandHandler>,
}

/// Registration-order command table. Built once at startup by the composition
/// root, then shared read-only across concurrent callers.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<RegisteredCommand>,
    index: BTreeMap<&'static str, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        spec: &'static CommandSpec,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<(), RegistryError> {
        crate::shared::ids::validate_identifier_value("command name", spec.name).map_err(
            |reason| RegistryError::InvalidName {
                name: spec.name.to_string(),
                reason,
            },
        )?;
        if spec.description.len() < MIN_DESCRIPTION_LEN {
            return Err(RegistryError::DescriptionTooShort {
                name: spec.name.to_string(),
            });
        }
        if self.index.contains_key(spec.name) {
            return Err(RegistryError::DuplicateCommand {
                name: spec.name.to_string(),
            });
        }
        self.index.insert(spec.name, self.commands.len());
        self.commands.push(RegisteredCommand { spec, handler });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&RegisteredCommand> {
        self.index.get(name).map(|idx| &self.commands[*idx])
    }

    /// Registration order, stable; used for discovery and documentation.
    pub fn list(&self) -> impl Iterator<Item = &'static CommandSpec> + '_ {
        self.commands.iter().map(|command| command.spec)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::catalog::{ArgSpec, CommandSpec};
    use serde_json::json;

    struct StaticHandler;

    impl CommandHandler for StaticHandler {
        fn handle(&self, _input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
            Ok(HandlerOutput::new(json!({}), "static handler ran"))
        }
    }

    static SPEC_A: CommandSpec = CommandSpec {
        name: "test.first",
        description: "First test command registration",
        args: &[] as &[ArgSpec],
        read_only: true,
    };

    static SPEC_B: CommandSpec = CommandSpec {
        name: "test.second",
        description: "Second test command registration",
        args: &[] as &[ArgSpec],
        read_only: true,
    };

    static SPEC_SHORT: CommandSpec = CommandSpec {
        name: "test.short",
        description: "too short",
        args: &[] as &[ArgSpec],
        read_only: true,
    };

    #[test]
    fn registration_order_is_preserved() {
        let mut registry = CommandRegistry::new();
        registry
            .register(&SPEC_A, Arc::new(StaticHandler))
            .expect("register first");
        registry
            .register(&SPEC_B, Arc::new(StaticHandler))
            .expect("register second");
        let names: Vec<&str> = registry.list().map(|spec| spec.name).collect();
        assert_eq!(names, vec!["test.first", "test.second"]);
    }

    #[test]
    fn duplicate_names_fail_fast() {
        let mut registry = CommandRegistry::new();
        registry
            .register(&SPEC_A, Arc::new(StaticHandler))
            .expect("register");
        let err = registry
            .register(&SPEC_A, Arc::new(StaticHandler))
            .expect_err("duplicate");
        assert!(matches!(err, RegistryError::DuplicateCommand { .. }));
    }

    #[test]
    fn short_descriptions_are_rejected() {
        let mut registry = CommandRegistry::new();
        let err = registry
            .register(&SPEC_SHORT, Arc::new(StaticHandler))
            .expect_err("short description");
        assert!(matches!(err, RegistryError::DescriptionTooShort { .. }));
    }
}
