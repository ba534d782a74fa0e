//! Single-shot command line entrypoint: dispatch one command against the
//! configured state root and print the result envelope as JSON.

use crate::config::{load_settings, Settings};
use crate::server::MechanicServer;
use serde_json::{Map, Value};
use std::path::PathBuf;

const STATE_ROOT_ENV: &str = "MECHANIC_STATE_ROOT";
const SETTINGS_ENV: &str = "MECHANIC_SETTINGS";

const USAGE: &str = "usage: mechanic <command> [json-input]\n       mechanic commands";

fn state_root() -> PathBuf {
    std::env::var(STATE_ROOT_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".mechanic"))
}

fn settings() -> Result<Settings, String> {
    match std::env::var(SETTINGS_ENV) {
        Ok(path) => load_settings(PathBuf::from(path).as_path()).map_err(|err| err.to_string()),
        Err(_) => Ok(Settings::default()),
    }
}

fn parse_input(raw: Option<&str>) -> Result<Map<String, Value>, String> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    let value: Value =
        serde_json::from_str(raw).map_err(|err| format!("input is not valid json: {err}"))?;
    value
        .as_object()
        .cloned()
        .ok_or_else(|| "input must be a json object".to_string())
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let mut iter = args.iter();
    let command = iter.next().ok_or_else(|| USAGE.to_string())?;
    let server = MechanicServer::new(&state_root(), settings()?).map_err(|err| err.to_string())?;

    if command == "commands" {
        let names: Vec<&str> = server.dispatcher().registry().list().map(|s| s.name).collect();
        return Ok(names.join("\n"));
    }

    let input = parse_input(iter.next().map(String::as_str))?;
    if iter.next().is_some() {
        return Err(USAGE.to_string());
    }
    let result = server.dispatch(command, &input);
    serde_json::to_string_pretty(&result).map_err(|err| err.to_string())
}
