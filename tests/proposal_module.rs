use mechanic::commands::ErrorKind;
use mechanic::config::Settings;
use mechanic::MechanicServer;
use serde_json::{json, Map, Value};

fn obj(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object input")
}

fn server() -> (tempfile::TempDir, MechanicServer) {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MechanicServer::new(dir.path(), Settings::default()).expect("server");
    (dir, server)
}

fn create_input(title: &str, risk: &str, confidence: f64) -> Map<String, Value> {
    obj(json!({
        "title": title,
        "proposal_type": "rule",
        "suggested_change": "cache the cooldown texture handle between frames",
        "confidence": confidence,
        "risk_level": risk,
        "evidence_refs": ["perf/PixelCooldown", "workflows/tasks/t1.json"],
    }))
}

#[test]
fn create_returns_a_prefixed_id_and_echoes_evidence_as_sources() {
    let (_dir, server) = server();
    let result = server.dispatch("proposal.create", &create_input("cache textures", "low", 0.8));
    assert!(result.success, "create failed: {:?}", result.error);
    let data = result.data.expect("data");
    assert!(data["proposal_id"]
        .as_str()
        .expect("id")
        .starts_with("proposal-"));
    assert_eq!(data["status"], "pending");
    let sources = result.sources.expect("sources");
    assert_eq!(sources.len(), 2);
}

#[test]
fn confidence_outside_the_unit_interval_is_rejected() {
    let (_dir, server) = server();
    let result = server.dispatch("proposal.create", &create_input("over", "low", 1.5));
    assert_eq!(result.error_kind(), Some(ErrorKind::ValidationError));
    let result = server.dispatch("proposal.create", &create_input("under", "low", -0.1));
    assert_eq!(result.error_kind(), Some(ErrorKind::ValidationError));
}

#[test]
fn unknown_risk_level_is_rejected() {
    let (_dir, server) = server();
    let result = server.dispatch("proposal.create", &create_input("risky", "extreme", 0.5));
    assert_eq!(result.error_kind(), Some(ErrorKind::ValidationError));
}

#[test]
fn list_honours_limit_while_total_counts_every_match() {
    let (_dir, server) = server();
    for title in ["one", "two", "three"] {
        assert!(server
            .dispatch("proposal.create", &create_input(title, "low", 0.5))
            .success);
    }
    let result = server.dispatch("proposal.list", &obj(json!({"limit": 2})));
    assert!(result.success, "list failed: {:?}", result.error);
    let data = result.data.expect("data");
    assert_eq!(data["total"], 3);
    assert_eq!(data["items"].as_array().expect("items").len(), 2);
}

#[test]
fn filters_narrow_by_risk_level() {
    let (_dir, server) = server();
    server.dispatch("proposal.create", &create_input("safe", "low", 0.5));
    server.dispatch("proposal.create", &create_input("spicy", "high", 0.5));

    let result = server.dispatch(
        "proposal.list",
        &obj(json!({"limit": 10, "filters": {"risk_level": "high"}})),
    );
    let data = result.data.expect("data");
    assert_eq!(data["total"], 1);
    assert_eq!(data["items"][0]["title"], "spicy");
}

#[test]
fn unknown_filter_names_are_rejected() {
    let (_dir, server) = server();
    let result = server.dispatch(
        "proposal.list",
        &obj(json!({"limit": 10, "filters": {"author": "me"}})),
    );
    assert_eq!(result.error_kind(), Some(ErrorKind::ValidationError));
}
