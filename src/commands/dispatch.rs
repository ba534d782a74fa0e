use crate::commands::catalog::{ArgSpec, ArgType, CommandSpec};
use crate::commands::envelope::{CommandResult, ErrorKind};
use crate::commands::registry::CommandRegistry;
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Stateless dispatcher over an immutable registry. Validates input against
/// the command's declared schema, invokes the handler, and normalizes every
/// failure mode into the result envelope; nothing escapes this boundary.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn dispatch(&self, command_name: &str, input: &Map<String, Value>) -> CommandResult {
        let Some(command) = self.registry.lookup(command_name) else {
            return CommandResult::err(
                ErrorKind::UnknownCommand,
                format!("unknown command `{command_name}`"),
            );
        };

        if let Err(reason) = validate_input(command.spec, input) {
            return CommandResult::err(ErrorKind::ValidationError, reason);
        }

        let handler = command.handler.clone();
        let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(input)));
        match outcome {
            Ok(Ok(output)) => {
                if output.reasoning.trim().is_empty() {
                    return CommandResult::err(
                        ErrorKind::Internal,
                        format!("command `{command_name}` returned success without reasoning"),
                    );
                }
                CommandResult::ok(output.data, output.reasoning, output.sources)
            }
            Ok(Err(failure)) => {
                let message = if failure.message.trim().is_empty() {
                    format!("command `{command_name}` failed without a message")
                } else {
                    failure.message
                };
                CommandResult::err(failure.kind, message)
            }
            Err(panic) => CommandResult::err(
                ErrorKind::Internal,
                format!(
                    "command `{command_name}` raised an unexpected failure: {}",
                    panic_message(&panic)
                ),
            ),
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Closed-schema validation: every declared required field present and typed,
/// no undeclared fields accepted.
pub fn validate_input(spec: &CommandSpec, input: &Map<String, Value>) -> Result<(), String> {
    for key in input.keys() {
        if !spec.args.iter().any(|arg| arg.name == key) {
            return Err(format!(
                "command `{}` does not accept field `{key}`",
                spec.name
            ));
        }
    }
    for arg in spec.args {
        match input.get(arg.name) {
            Some(value) => validate_arg_value(spec.name, arg, value)?,
            None if arg.required => {
                return Err(format!(
                    "command `{}` requires field `{}`",
                    spec.name, arg.name
                ));
            }
            None => {}
        }
    }
    Ok(())
}

fn validate_arg_value(command: &str, arg: &ArgSpec, value: &Value) -> Result<(), String> {
    let ok = match arg.arg_type {
        ArgType::String => match value.as_str() {
            Some(raw) if arg.required && raw.trim().is_empty() => {
                return Err(format!(
                    "command `{command}` requires a non-empty `{}`",
                    arg.name
                ));
            }
            Some(_) => true,
            None => false,
        },
        ArgType::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
        ArgType::Number => value.as_f64().is_some(),
        ArgType::Boolean => value.is_boolean(),
        ArgType::Object => value.is_object(),
        ArgType::Array => value.is_array(),
    };
    if ok {
        Ok(())
    } else {
        Err(format!(
            "field `{}` of command `{command}` must be {}",
            arg.name,
            arg.arg_type.expected_label()
        ))
    }
}

pub fn required_str<'a>(input: &'a Map<String, Value>, name: &str) -> Result<&'a str, String> {
    match input.get(name).and_then(Value::as_str) {
        Some(raw) if !raw.trim().is_empty() => Ok(raw),
        _ => Err(format!("missing required field `{name}`")),
    }
}

pub fn optional_str<'a>(input: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    input
        .get(name)
        .and_then(Value::as_str)
        .filter(|raw| !raw.trim().is_empty())
}

pub fn required_f64(input: &Map<String, Value>, name: &str) -> Result<f64, String> {
    input
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("missing required field `{name}`"))
}

pub fn required_usize(input: &Map<String, Value>, name: &str) -> Result<usize, String> {
    let value = input
        .get(name)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("field `{name}` must be a non-negative integer"))?;
    usize::try_from(value).map_err(|_| format!("field `{name}` is too large"))
}

pub fn optional_bool(input: &Map<String, Value>, name: &str) -> bool {
    input
        .get(name)
        .and_then(Value::as_bool)
        .unwrap_or_default()
}

pub fn optional_object<'a>(
    input: &'a Map<String, Value>,
    name: &str,
) -> Option<&'a Map<String, Value>> {
    input.get(name).and_then(Value::as_object)
}
