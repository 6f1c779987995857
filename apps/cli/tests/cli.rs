//! End-to-end coverage of the `nervemind` binary's command surface,
//! exercised as a real subprocess rather than through internal APIs.

use assert_cmd::Command;
use predicates::str::contains;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("nervemind").unwrap();
    let config_dir = tempfile::tempdir().unwrap();
    cmd.env("NERVEMIND_EXECUTION_DEFAULT_TIMEOUT_MS", "5000");
    cmd.env("NERVEMIND_CONFIG", config_dir.path().join("unused.toml"));
    cmd
}

#[test]
fn status_on_an_unknown_execution_id_exits_with_config_error() {
    cli()
        .args(["status", "00000000-0000-0000-0000-000000000000"])
        .assert()
        .code(2)
        .stderr(contains("no execution record found"));
}

#[test]
fn run_rejects_a_missing_workflow_file() {
    cli()
        .args(["run", "--workflow", "/nonexistent/workflow.json"])
        .assert()
        .code(2);
}

#[test]
fn run_executes_a_single_manual_node_workflow_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let workflow_path = dir.path().join("workflow.json");
    std::fs::write(
        &workflow_path,
        serde_json::json!({
            "id": 1,
            "version": 1,
            "name": "noop",
            "nodes": [
                {
                    "id": "start",
                    "nodeType": "manualTrigger",
                    "trigger": {"type": "manual"}
                },
                {
                    "id": "set1",
                    "nodeType": "set",
                    "parameters": {"fields": {"greeting": "hello"}, "keepOnlySet": false}
                }
            ],
            "connections": [
                {"id": "c1", "fromNode": "start", "toNode": "set1"}
            ],
            "settings": {}
        })
        .to_string(),
    )
    .unwrap();

    cli()
        .args(["run", "--workflow", workflow_path.to_str().unwrap()])
        .assert()
        .code(0)
        .stdout(contains("\"status\": \"success\""));
}
