use crate::commands::catalog::{ArgType, CommandSpec, V1_COMMANDS};
use crate::commands::dispatch::optional_str;
use crate::commands::envelope::{HandlerFailure, HandlerOutput};
use crate::commands::registry::CommandHandler;
use serde_json::{json, Map, Value};
use std::fmt::Write as _;

fn type_label(arg_type: ArgType) -> &'static str {
    match arg_type {
        ArgType::String => "string",
        ArgType::Integer => "integer",
        ArgType::Number => "number",
        ArgType::Boolean => "boolean",
        ArgType::Object => "object",
        ArgType::Array => "array",
    }
}

fn command_json(spec: &CommandSpec) -> Value {
    json!({
        "name": spec.name,
        "description": spec.description,
        "read_only": spec.read_only,
        "args": spec
            .args
            .iter()
            .map(|arg| {
                json!({
                    "name": arg.name,
                    "type": type_label(arg.arg_type),
                    "required": arg.required,
                    "description": arg.description,
                })
            })
            .collect::<Vec<_>>(),
    })
}

fn render_markdown(specs: &[&CommandSpec]) -> String {
    let mut out = String::from("# Command surface\n");
    for spec in specs {
        let _ = write!(out, "\n## `{}`\n\n{}\n", spec.name, spec.description);
        if spec.args.is_empty() {
            out.push_str("\nNo arguments.\n");
            continue;
        }
        out.push_str("\n| Argument | Type | Required | Description |\n");
        out.push_str("| --- | --- | --- | --- |\n");
        for arg in spec.args {
            let _ = writeln!(
                out,
                "| `{}` | {} | {} | {} |",
                arg.name,
                type_label(arg.arg_type),
                if arg.required { "yes" } else { "no" },
                arg.description
            );
        }
    }
    out
}

/// Renders the command surface from the static catalog, so the docs can
/// never drift from what the server actually registers.
pub struct DocsGenerateHandler;

impl CommandHandler for DocsGenerateHandler {
    fn handle(&self, input: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let format = optional_str(input, "format").unwrap_or("markdown");
        let data = match format {
            "markdown" => json!({
                "format": "markdown",
                "content": render_markdown(V1_COMMANDS),
            }),
            "json" => json!({
                "format": "json",
                "commands": V1_COMMANDS.iter().map(|spec| command_json(spec)).collect::<Vec<_>>(),
            }),
            other => {
                return Err(HandlerFailure::validation(format!(
                    "format must be markdown or json, got `{other}`"
                )));
            }
        };
        let reasoning = format!(
            "rendered {} command(s) from the catalog as {format}",
            V1_COMMANDS.len()
        );
        Ok(HandlerOutput::new(data, reasoning))
    }
}
